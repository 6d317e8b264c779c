mod model;
mod route;

use proc_macro::TokenStream;

/// Creates a new documentation function for the route, named after the original function with the suffix `_docs`.
///
/// The first line of the doc comment becomes the operation summary, the remaining lines its description.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}

/// Creates two input structs for the model: `CreateX` and `UpdateX`.
///
/// Fields marked `#[serde(skip)]` or `#[serde(skip_deserializing)]` are owned by the
/// server and never appear in either input. The remaining fields keep their `doc`,
/// `serde`, `validate` and `schemars` attributes; in `UpdateX` every field is optional.
#[proc_macro_attribute]
pub fn model(_args: TokenStream, input: TokenStream) -> TokenStream {
	model::from_input(input)
}
