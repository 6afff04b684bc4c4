/// The state of one reliable multicast instance.
///
/// States only ever advance, in declaration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    /// We either never saw any data related to this instance, or we cleared
    /// it.
    #[default]
    Unknown,
    /// We received or sent the data being multicast, but have not signed it
    /// yet.
    Data,
    /// We signed the data, but have not yet seen a proof of successful
    /// multicast.
    Signed,
    /// We have a proof that the data has been multicast successfully.
    Finished,
}
