pub mod image;
pub mod prepare;

pub use self::image::{csv_to_png, image_to_query_input, ImageSample};
pub use prepare::{
    normalize_pixel, prepare_dataset, prepare_test_labels, prepare_train_labels, read_records, Dataset,
};
