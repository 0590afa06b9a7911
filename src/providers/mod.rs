pub mod teamcity;

pub use teamcity::Identifier;
