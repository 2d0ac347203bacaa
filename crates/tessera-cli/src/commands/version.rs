//! Version command implementation.

use tessera_types::{AttributeType, Operator};

use crate::style::print_labeled;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

/// Prints the version and the condition vocabulary this build understands.
pub fn run() {
    println!("{NAME} {VERSION}");
    println!();
    println!("Condition operators:");
    for attribute_type in [AttributeType::Integer, AttributeType::String, AttributeType::Boolean] {
        let operators: Vec<&str> = attribute_type
            .allowed_operators()
            .iter()
            .map(Operator::as_str)
            .collect();
        print_labeled(attribute_type.as_str(), &operators.join(" "));
    }
}
