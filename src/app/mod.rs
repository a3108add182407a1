mod orchestrator;
mod records;
mod runtime;

#[cfg(test)]
mod tests;

pub use orchestrator::NutriscanApp;
