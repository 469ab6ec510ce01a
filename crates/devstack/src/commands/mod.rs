pub mod dev;
pub mod migrate;
pub mod quality;
pub mod scripts;
pub mod serve;
pub mod test;
