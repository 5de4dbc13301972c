pub mod camping_option;
