/// An owned dynamically typed [`Future`] returned by the connector and resource seams, so
/// implementations can be used as trait objects and mocked.
pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;
