mod newsletter;
mod subscriber;

pub use newsletter::{Newsletter, NewsletterCatalog};
pub use subscriber::Subscriber;

#[cfg(test)]
pub use newsletter::fixtures;
