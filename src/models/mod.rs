pub mod merton;
pub mod option;
pub mod params;
