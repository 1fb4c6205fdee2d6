/// Environment-backed service configuration.
///
/// Each service defines one `Deserialize` struct whose field names map to
/// env var names (uppercased by `envy`), marks it `impl Config`, and calls
/// `from_env()` once at startup. A missing or malformed variable aborts the
/// process there and then — a service must not come up half-configured.
pub trait Config: Sized + serde::de::DeserializeOwned {
    fn from_env() -> Self {
        envy::from_env().expect("failed to load config from environment")
    }
}
