pub mod ta;
