//! Procedural macros for tgql.
//!
//! - `#[derive(Selectable)]` turns a struct into a selection: its fields are
//!   the picked fields, and nested `Selectable` types become sub-selections.
//! - `selection!` writes a selection in GraphQL syntax.
//!
//! # Example
//!
//! ```ignore
//! use tgql_sdk::{selection, Selectable};
//!
//! #[derive(Selectable, serde::Deserialize)]
//! #[selection(rename_all = "camelCase")]
//! struct User {
//!     id: i64,
//!     registered_at: String,
//!     posts: Vec<Post>,
//! }
//!
//! let nodes = selection! {
//!     id
//!     posts(first: 3, after: $cursor) { title }
//! };
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{
    braced, bracketed, parenthesized, parse_macro_input, token, Attribute, Data, DeriveInput,
    Fields, Ident, Lit, LitStr, Token,
};

/// Derive macro for typed selections.
///
/// Container attributes:
/// - `#[selection(rename_all = "camelCase")]` renames every field.
///
/// Field attributes:
/// - `#[selection(rename = "name")]` selects the field under another name;
/// - `#[selection(leaf)]` selects the field without a sub-selection, for
///   custom scalars deserialised into structs;
/// - `#[selection(skip)]` leaves the field out.
///
/// # Example
///
/// ```ignore
/// #[derive(Selectable)]
/// #[selection(rename_all = "camelCase")]
/// pub struct Post {
///     pub id: i64,
///     pub author_id: i64,
///     #[selection(leaf)]
///     pub published_at: Timestamp,
/// }
/// ```
#[proc_macro_derive(Selectable, attributes(selection))]
pub fn derive_selectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_selectable(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_selectable(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "Selectable can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            name,
            "Selectable needs a struct with named fields",
        ));
    };

    let rename_all = parse_container_attrs(&input.attrs)?;

    let mut nodes = Vec::with_capacity(fields.named.len());
    for field in &fields.named {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = &field.ident else {
            continue;
        };
        let key = attrs
            .rename
            .unwrap_or_else(|| rename_all.apply(&ident.unraw().to_string()));
        let ty = &field.ty;
        nodes.push(if attrs.leaf {
            quote! { ::tgql_sdk::QueryNode::leaf(#key) }
        } else {
            quote! { <#ty as ::tgql_sdk::SelectField>::select_field(#key) }
        });
    }

    Ok(quote! {
        impl #impl_generics ::tgql_sdk::Selectable for #name #ty_generics #where_clause {
            fn selection() -> ::std::vec::Vec<::tgql_sdk::QueryNode> {
                ::std::vec![#(#nodes),*]
            }
        }

        impl #impl_generics ::tgql_sdk::SelectField for #name #ty_generics #where_clause {
            fn select_field(key: &str) -> ::tgql_sdk::QueryNode {
                ::tgql_sdk::QueryNode::object(
                    key,
                    <Self as ::tgql_sdk::Selectable>::selection(),
                )
            }
        }
    })
}

#[derive(Clone, Copy)]
enum RenameRule {
    None,
    CamelCase,
}

impl RenameRule {
    fn apply(self, field: &str) -> String {
        match self {
            Self::None => field.to_owned(),
            Self::CamelCase => tgql_core::to_camel_case(field),
        }
    }
}

fn parse_container_attrs(attrs: &[Attribute]) -> syn::Result<RenameRule> {
    let mut rule = RenameRule::None;
    for attr in attrs {
        if !attr.path().is_ident("selection") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                let value: LitStr = meta.value()?.parse()?;
                rule = match value.value().as_str() {
                    "camelCase" => RenameRule::CamelCase,
                    "snake_case" | "none" => RenameRule::None,
                    other => {
                        return Err(meta.error(format!(
                            "unsupported rename_all rule `{other}`, expected \"camelCase\" or \"snake_case\""
                        )))
                    }
                };
                Ok(())
            } else {
                Err(meta.error("unknown selection attribute"))
            }
        })?;
    }
    Ok(rule)
}

#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    leaf: bool,
    skip: bool,
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("selection") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                parsed.rename = Some(value.value());
            } else if meta.path.is_ident("leaf") {
                parsed.leaf = true;
            } else if meta.path.is_ident("skip") {
                parsed.skip = true;
            } else {
                return Err(meta.error("unknown selection attribute"));
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

/// Builds a `Vec<QueryNode>` from GraphQL selection syntax.
///
/// Arguments accept numbers, strings, booleans, `null`, lists, objects and
/// `$variable` references.
///
/// # Example
///
/// ```ignore
/// let nodes = selection! {
///     id
///     username
///     posts(first: 10, orderBy: { field: "createdAt" }) {
///         title
///     }
/// };
/// ```
#[proc_macro]
pub fn selection(input: TokenStream) -> TokenStream {
    let set = parse_macro_input!(input as SelectionSet);
    TokenStream::from(set.expand())
}

struct SelectionSet {
    items: Vec<SelectionItem>,
}

struct SelectionItem {
    key: String,
    arguments: Option<Vec<(String, ArgValue)>>,
    children: Option<SelectionSet>,
}

enum ArgValue {
    Variable(String),
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(LitStr),
    List(Vec<ArgValue>),
    Object(Vec<(String, ArgValue)>),
}

impl Parse for SelectionSet {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut items = Vec::new();
        while !input.is_empty() {
            items.push(input.parse()?);
            // Commas between fields are optional, as in GraphQL.
            let _: Option<Token![,]> = input.parse()?;
        }
        Ok(Self { items })
    }
}

impl Parse for SelectionItem {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let key = Ident::parse_any(input)?.unraw().to_string();

        let arguments = if input.peek(token::Paren) {
            let content;
            parenthesized!(content in input);
            let fields = Punctuated::<ObjectField, Token![,]>::parse_terminated(&content)?;
            Some(fields.into_iter().map(|f| (f.name, f.value)).collect())
        } else {
            None
        };

        let children = if input.peek(token::Brace) {
            let content;
            braced!(content in input);
            let set: SelectionSet = content.parse()?;
            if set.items.is_empty() {
                return Err(input.error(format!("`{key}` has an empty selection")));
            }
            Some(set)
        } else {
            None
        };

        Ok(Self {
            key,
            arguments,
            children,
        })
    }
}

struct ObjectField {
    name: String,
    value: ArgValue,
}

impl Parse for ObjectField {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let name = Ident::parse_any(input)?.unraw().to_string();
        input.parse::<Token![:]>()?;
        let value = input.parse()?;
        Ok(Self { name, value })
    }
}

impl Parse for ArgValue {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(Token![$]) {
            input.parse::<Token![$]>()?;
            let name = Ident::parse_any(input)?.unraw();
            return Ok(Self::Variable(format!("${name}")));
        }
        if input.peek(token::Bracket) {
            let content;
            bracketed!(content in input);
            let items = Punctuated::<ArgValue, Token![,]>::parse_terminated(&content)?;
            return Ok(Self::List(items.into_iter().collect()));
        }
        if input.peek(token::Brace) {
            let content;
            braced!(content in input);
            let fields = Punctuated::<ObjectField, Token![,]>::parse_terminated(&content)?;
            return Ok(Self::Object(
                fields.into_iter().map(|f| (f.name, f.value)).collect(),
            ));
        }
        if input.peek(Token![-]) {
            input.parse::<Token![-]>()?;
            return match input.parse::<Lit>()? {
                Lit::Int(lit) => Ok(Self::Int(-lit.base10_parse::<i64>()?)),
                Lit::Float(lit) => Ok(Self::Float(-lit.base10_parse::<f64>()?)),
                other => Err(syn::Error::new_spanned(other, "expected a number after `-`")),
            };
        }
        if input.peek(Ident::peek_any) {
            let ident = Ident::parse_any(input)?;
            return match ident.to_string().as_str() {
                "null" => Ok(Self::Null),
                "true" => Ok(Self::Bool(true)),
                "false" => Ok(Self::Bool(false)),
                _ => Err(syn::Error::new_spanned(
                    ident,
                    "expected a literal, `null` or a `$variable`",
                )),
            };
        }
        match input.parse::<Lit>()? {
            Lit::Str(lit) => Ok(Self::Str(lit)),
            Lit::Int(lit) => Ok(Self::Int(lit.base10_parse()?)),
            Lit::Float(lit) => Ok(Self::Float(lit.base10_parse()?)),
            Lit::Bool(lit) => Ok(Self::Bool(lit.value)),
            other => Err(syn::Error::new_spanned(other, "unsupported literal")),
        }
    }
}

impl SelectionSet {
    fn expand(&self) -> TokenStream2 {
        let nodes = self.items.iter().map(SelectionItem::expand);
        quote! { ::std::vec![#(#nodes),*] }
    }
}

impl SelectionItem {
    fn expand(&self) -> TokenStream2 {
        let key = &self.key;
        let node = match &self.children {
            Some(children) => {
                let children = children.expand();
                quote! { ::tgql_sdk::QueryNode::object(#key, #children) }
            }
            None => quote! { ::tgql_sdk::QueryNode::leaf(#key) },
        };
        match &self.arguments {
            Some(fields) => {
                let arguments = expand_object(fields);
                quote! { #node.with_arguments(#arguments) }
            }
            None => node,
        }
    }
}

impl ArgValue {
    fn expand(&self) -> TokenStream2 {
        let json = quote! { ::tgql_sdk::__private::serde_json };
        match self {
            Self::Variable(name) => {
                quote! { #json::Value::String(::std::string::String::from(#name)) }
            }
            Self::Null => quote! { #json::Value::Null },
            Self::Bool(b) => quote! { #json::Value::Bool(#b) },
            // Negative literals are emitted as a negated positive literal.
            Self::Int(n) if *n < 0 => {
                let abs = n.unsigned_abs();
                quote! { #json::Value::from(-(#abs as i64)) }
            }
            Self::Int(n) => quote! { #json::Value::from(#n) },
            Self::Float(n) if n.is_sign_negative() => {
                let abs = n.abs();
                quote! { #json::Value::from(-#abs) }
            }
            Self::Float(n) => quote! { #json::Value::from(#n) },
            Self::Str(lit) => quote! { #json::Value::String(::std::string::String::from(#lit)) },
            Self::List(items) => {
                let items = items.iter().map(ArgValue::expand);
                quote! { #json::Value::Array(::std::vec![#(#items),*]) }
            }
            Self::Object(fields) => expand_object(fields),
        }
    }
}

fn expand_object(fields: &[(String, ArgValue)]) -> TokenStream2 {
    let json = quote! { ::tgql_sdk::__private::serde_json };
    let inserts = fields.iter().map(|(name, value)| {
        let value = value.expand();
        quote! { map.insert(::std::string::String::from(#name), #value); }
    });
    quote! {
        {
            let mut map = #json::Map::new();
            #(#inserts)*
            #json::Value::Object(map)
        }
    }
}
