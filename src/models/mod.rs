mod article;
mod digest;
mod newsletter;
mod subscriber;

pub(crate) use article::parse_datetime;
pub use article::{PublishedAt, RawArticle};
pub use digest::{digest_summary, digest_title, WeeklyDigest};
pub use newsletter::{ArchivedNewsletter, GenerationStatus, NewNewsletter};
pub use subscriber::{is_valid_email, Subscriber};
