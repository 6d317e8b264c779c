use darling::{ast, FromDeriveInput, FromField};
use proc_macro2::TokenTree;
use quote::{format_ident, quote, ToTokens};
use syn::Meta;

/// Attributes that carry over from the model onto the generated inputs.
/// Anything else (derives, `sqlx` hints, lints) stays on the model.
const FORWARDED: &[&str] = &["doc", "serde", "validate", "schemars"];

#[derive(Debug, FromDeriveInput)]
#[darling(supports(struct_named), forward_attrs)]
struct ModelInputReceiver {
	ident: syn::Ident,

	data: ast::Data<(), ModelFieldReceiver>,

	attrs: Vec<syn::Attribute>,
}

#[derive(Debug, FromField)]
#[darling(forward_attrs)]
struct ModelFieldReceiver {
	ident: Option<syn::Ident>,

	ty: syn::Type,
	vis: syn::Visibility,

	attrs: Vec<syn::Attribute>,
}

fn is_forwarded(attr: &syn::Attribute) -> bool {
	FORWARDED.iter().any(|name| attr.path().is_ident(name))
}

/// Whether the field is marked `#[serde(skip)]` or `#[serde(skip_deserializing)]`,
/// meaning a client can never set it.
fn is_server_owned(attrs: &[syn::Attribute]) -> bool {
	attrs.iter().any(|attr| {
		let Meta::List(ref list) = attr.meta else {
			return false;
		};

		if !list.path.is_ident("serde") {
			return false;
		}

		list.tokens.to_token_stream().into_iter().any(|token| {
			matches!(token, TokenTree::Ident(ref ident) if ident == "skip_deserializing" || ident == "skip")
		})
	})
}

pub fn from_input(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
	let input = syn::parse_macro_input!(input as syn::DeriveInput);
	let receiver = match ModelInputReceiver::from_derive_input(&input) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	let ident = &receiver.ident;
	let vis = &input.vis;
	let create_ident = format_ident!("Create{}", ident);
	let update_ident = format_ident!("Update{}", ident);

	let struct_attrs = receiver
		.attrs
		.iter()
		.filter(|attr| attr.path().is_ident("serde"))
		.collect::<Vec<_>>();

	let Some(fields) = receiver.data.take_struct() else {
		return syn::Error::new_spanned(ident, "#[model] only supports structs with named fields")
			.to_compile_error()
			.into();
	};

	let fields = fields
		.iter()
		.filter(|field| !is_server_owned(&field.attrs))
		.filter_map(|field| {
			let attrs = field
				.attrs
				.iter()
				.filter(|attr| is_forwarded(attr))
				.collect::<Vec<_>>();

			Some((attrs, field.ident.as_ref()?, &field.ty, &field.vis))
		})
		.collect::<Vec<_>>();

	let create_fields = fields.iter().map(|(attrs, ident, ty, vis)| {
		quote! {
			#(#attrs)*
			#vis #ident: #ty,
		}
	});

	let update_fields = fields.iter().map(|(attrs, ident, ty, vis)| {
		quote! {
			#(#attrs)*
			#vis #ident: ::core::option::Option<#ty>,
		}
	});

	let update_field_idents = fields.iter().map(|(_, ident, _, _)| ident);

	let create_doc = format!("Fields a client supplies when creating a [`{ident}`].");
	let update_doc = format!(
		"Fields a client may change on an existing [`{ident}`]. Omitted fields are left as-is."
	);

	quote! {
		#input

		#[doc = #create_doc]
		#[derive(Debug, serde::Deserialize, schemars::JsonSchema, validator::Validate)]
		#(#struct_attrs)*
		#vis struct #create_ident {
			#(
				#create_fields
			)*
		}

		#[doc = #update_doc]
		#[derive(Debug, Default, serde::Deserialize, schemars::JsonSchema, validator::Validate)]
		#(#struct_attrs)*
		#vis struct #update_ident {
			#(
				#update_fields
			)*
		}

		impl #update_ident {
			/// Whether the update would not change anything.
			pub fn is_empty(&self) -> bool {
				true #(&& self.#update_field_idents.is_none())*
			}
		}
	}
	.into()
}
