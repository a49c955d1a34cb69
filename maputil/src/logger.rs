/// Intercept messages using the `log` crate and print them to STDERR. Defaults to showing `info`
/// and above; override with `RUST_LOG`.
pub fn setup() {
    use env_logger::{Builder, Env};
    Builder::from_env(Env::default().default_filter_or("info")).init();
}
