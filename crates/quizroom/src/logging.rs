//! Logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`.
///
/// When `RUST_LOG` is unset, the quizroom crates and `binary_name` log at
/// `default_level`, everything else stays quiet.
///
/// ```no_run
/// quizroom::logging::init("trivia_server", "info");
/// ```
pub fn init(binary_name: &str, default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(binary_name, default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_directives(binary_name: &str, level: &str) -> String {
    ["quizroom", "quizroom_room", "quizroom_protocol", "quizroom_transport"]
        .iter()
        .copied()
        .chain(std::iter::once(binary_name))
        .map(|target| format!("{}={level}", target.replace('-', "_")))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_crates_and_binary() {
        let directives = default_directives("trivia-server", "debug");
        assert!(directives.starts_with("quizroom=debug,"));
        assert!(directives.contains("quizroom_room=debug"));
        assert!(directives.ends_with("trivia_server=debug"));
    }
}
