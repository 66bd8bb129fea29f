pub mod flatten;
pub mod tabs;
