/// Client-side navigation primitive.
///
/// The guard calls it once, on `Denied`, with the login entry point.
pub trait Navigator: Send + Sync {
    fn redirect_to(&self, path: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect_to(&self, path: &str) {
        self(path)
    }
}
