pub mod pagsmile;
