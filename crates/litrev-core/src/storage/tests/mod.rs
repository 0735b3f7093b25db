// Storage system test module
#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod local_tests;
#[cfg(test)]
mod manager_tests;
#[cfg(test)]
mod settings_tests;
