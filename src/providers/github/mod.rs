mod client;
mod types;

#[cfg(test)]
mod tests;

pub use client::GitHubClient;
