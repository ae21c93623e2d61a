/// Read side of the consent banner.
pub trait ConsentProvider: Send + Sync {
    fn analytics_granted(&self) -> bool;
}

impl<F> ConsentProvider for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn analytics_granted(&self) -> bool {
        self()
    }
}
