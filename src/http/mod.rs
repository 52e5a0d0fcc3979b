pub mod headerset;
pub mod webpage;

// Re-exports for convenience
pub use headerset::HeaderSet;
pub use webpage::Webpage;
