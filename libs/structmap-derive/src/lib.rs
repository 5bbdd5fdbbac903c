use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// Derive macro for records that encode to and decode from maps.
///
/// Generates `structmap::Record` (walks the fields in declaration order) and
/// `structmap::Field` (so the record nests inside other records, lists and
/// options).
///
/// # Example
///
/// ```ignore
/// #[derive(Record)]
/// pub struct Server {
///     #[tag(structmap = "addr", json = "address,omitempty")]
///     pub addr: Option<IpAddr>,
///
///     #[tag(structmap = "-")]
///     pub cache: Vec<u8>,
///
///     #[tag(squash)]
///     pub common: Common,
/// }
/// ```
///
/// - `<tag-name> = "key[,omitempty]"`: map key under that tag name. Empty key
///   or no tag uses the field name; `-` skips the field.
/// - `squash`: flatten an embedded record into this record's keys.
#[proc_macro_derive(Record, attributes(tag))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record only supports structs",
            ));
        }
    };

    let mut encode_tokens = Vec::new();
    let mut decode_tokens = Vec::new();

    for field in fields {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let field_name_str = field_name.unraw().to_string();

        // Parse #[tag(...)] attributes.
        let mut squash = false;
        let mut tag_names: Vec<String> = Vec::new();
        let mut tag_values: Vec<String> = Vec::new();

        for attr in &field.attrs {
            if !attr.path().is_ident("tag") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("squash") {
                    squash = true;
                    return Ok(());
                }
                let tag_name = meta
                    .path
                    .get_ident()
                    .ok_or_else(|| meta.error("expected `squash` or `<tag-name> = \"...\"`"))?
                    .unraw()
                    .to_string();
                if tag_names.contains(&tag_name) {
                    return Err(meta.error(format!("duplicate tag '{tag_name}'")));
                }
                let value: LitStr = meta.value()?.parse()?;
                tag_names.push(tag_name);
                tag_values.push(value.value());
                Ok(())
            })?;
        }

        if squash {
            if !tag_names.is_empty() {
                return Err(syn::Error::new_spanned(
                    field_name,
                    "a squashed field takes its keys from the embedded record, remove its tags",
                ));
            }
            encode_tokens.push(quote! {
                __out.squash(&self.#field_name)?;
            });
            decode_tokens.push(quote! {
                #field_name: __input.squash()?,
            });
            continue;
        }

        let def = quote! {
            ::structmap::record::FieldDef {
                name: #field_name_str,
                tags: &[#((#tag_names, #tag_values)),*],
            }
        };
        encode_tokens.push(quote! {
            __out.field(&#def, &self.#field_name)?;
        });
        decode_tokens.push(quote! {
            #field_name: __input.field(&#def)?,
        });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::structmap::record::Record for #name #ty_generics #where_clause {
            fn encode_record(
                &self,
                __out: &mut ::structmap::walk::MapEncoder<'_>,
            ) -> ::core::result::Result<(), ::structmap::error::Error> {
                #(#encode_tokens)*
                ::core::result::Result::Ok(())
            }

            fn decode_record(
                __input: &mut ::structmap::walk::MapDecoder<'_>,
            ) -> ::core::result::Result<Self, ::structmap::error::Error> {
                ::core::result::Result::Ok(Self {
                    #(#decode_tokens)*
                })
            }
        }

        impl #impl_generics ::structmap::field::Field for #name #ty_generics #where_clause {
            fn type_desc() -> ::structmap::value::TypeDesc {
                ::structmap::value::TypeDesc::new(::structmap::value::Kind::Record)
            }

            fn encode_field(
                &self,
                __enc: &::structmap::walk::Encoder<'_>,
            ) -> ::core::result::Result<::structmap::value::Value, ::structmap::error::Error> {
                __enc.record(self)
            }

            fn decode_field(
                __value: ::structmap::value::Value,
                __dec: &::structmap::walk::Decoder<'_>,
            ) -> ::core::result::Result<Self, ::structmap::error::Error> {
                __dec.record(__value)
            }
        }
    };

    Ok(TokenStream::from(expanded))
}
