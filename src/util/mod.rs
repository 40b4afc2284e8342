pub mod alphabet;
pub mod dna;
