// Record model test module
#[cfg(test)]
mod dataset_tests;
