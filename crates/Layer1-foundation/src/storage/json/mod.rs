//! JSON 파일 저장소

mod store;

pub use store::{read_json, write_json, JsonStore};
