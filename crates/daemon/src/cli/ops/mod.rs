pub mod clean;
pub mod daemon;
pub mod gc;
pub mod get;
pub mod health;
pub mod housekeeping;
pub mod ls;
pub mod notify;
pub mod resign;
pub mod rm;
pub mod ttl;
pub mod upload;
pub mod version;

pub use clean::Clean;
pub use daemon::Daemon;
pub use gc::Gc;
pub use get::Get;
pub use health::Health;
pub use housekeeping::Housekeeping;
pub use ls::Ls;
pub use notify::Notify;
pub use resign::Resign;
pub use rm::Rm;
pub use ttl::Ttl;
pub use upload::Upload;
pub use version::Version;

/// Render unix seconds as an RFC 3339 UTC timestamp.
fn format_expiry(unix_s: f64) -> String {
    let secs = unix_s.floor();
    let nanos = ((unix_s - secs) * 1e9) as u32;
    match chrono::DateTime::from_timestamp(secs as i64, nanos) {
        Some(at) => at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        None => format!("{unix_s}"),
    }
}
