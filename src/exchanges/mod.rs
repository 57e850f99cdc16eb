pub mod ascendex;
