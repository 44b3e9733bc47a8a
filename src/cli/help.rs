//! Help message display for CLI.

#![allow(clippy::print_stdout)]

use crate::config::Config;

/// Print help message based on configuration state.
pub fn print_smart_help(config: &Config) {
    if config.models.is_empty() {
        print_first_time_help();
    } else {
        print_configured_help();
    }
}

/// Print detailed setup guide for first-time users.
pub fn print_first_time_help() {
    println!("No configuration found. Get started with Zamba:");
    println!();
    println!("1. Initialize configuration:");
    println!("   zamba config init");
    println!();
    println!("2. Export a species classifier to ONNX and write its labels file,");
    println!("   one species per line in model output order.");
    println!();
    println!("3. Add your model to configuration:");
    println!("   zamba models add african --path ./african.onnx --labels ./labels.txt --default");
    println!();
    println!("4. Classify videos:");
    println!("   zamba ./camera_trap_videos -o ./results");
    println!();
    println!("Input size, normalization, sampling and aggregation are set per model");
    println!("under [models.<name>] in the configuration file.");
    println!();
    println!("Run 'zamba -h' for all options.");
}

/// Print brief usage reminder for configured users.
pub fn print_configured_help() {
    println!("Usage: zamba [INPUTS]... [OPTIONS]");
    println!();
    println!("Example: zamba ./videos -m african -k 16 -f csv,json -o ./results");
    println!();
    println!("Run 'zamba -h' for all options or 'zamba models list' to see configured models.");
}
