pub mod activity;
pub mod appeals;
pub mod health;
pub mod jobs;
pub mod penalties;

#[cfg(test)]
pub(crate) mod test_support;
