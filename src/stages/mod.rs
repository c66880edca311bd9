//! Pipeline stages: note tracking, quantization, harmony, assembly

pub mod assemble;
pub mod harmony;
pub mod mono;
pub mod poly;
pub mod quantize;
