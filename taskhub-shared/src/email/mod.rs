/// Outbound email
///
/// Email is strictly best effort: request handlers enqueue a message and
/// move on, a background worker drains the queue through a
/// [`transport::MailTransport`], and failures are logged, never surfaced
/// to the caller.
///
/// # Modules
///
/// - `transport`: the delivery seam. `SmtpMailer` sends over SMTP via
///   lettre; `MockMailer` records messages for tests.
/// - `dispatcher`: bounded in-memory queue with a single worker task.
/// - `templates`: builders for every message the system sends.

pub mod dispatcher;
pub mod templates;
pub mod transport;

pub use dispatcher::EmailDispatcher;
pub use transport::{EmailMessage, MailTransport, MockMailer, SmtpConfig, SmtpMailer};
