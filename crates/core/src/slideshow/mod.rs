pub mod slideshow;
