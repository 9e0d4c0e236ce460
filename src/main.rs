//! Thin binary wrapper around the `syllable` library.
//!
//! Run:
//! - `cargo run` (system fonts, Hangul family query)
//! - `SYLLABLE_FONT=/path/to/BlackHanSans-Regular.ttf cargo run`
//! - `RUST_LOG=debug cargo run` for state-machine tracing

fn main() -> anyhow::Result<()> {
    // Keep logging setup in the binary so the library remains unopinionated.
    env_logger::init();

    let mut config = syllable::AppConfig::default();
    if let Some(path) = std::env::var_os("SYLLABLE_FONT") {
        config = config.with_font_path(path);
    }

    syllable::run_app(config)
}
