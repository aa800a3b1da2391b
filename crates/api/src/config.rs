//! Minimal environment-driven configuration, matching the teacher's inline
//! `UNISCHEDULE__SERVER__PORT` parsing in `main` — no dedicated config crate.

pub struct Config {
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("SCHOOLOPS__SERVER__PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);
        Self { port }
    }
}
