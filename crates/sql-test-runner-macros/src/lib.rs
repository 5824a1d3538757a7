use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

#[derive(Default)]
struct RecordAttrs {
    name: Option<String>,
    serde: bool,
    default: bool,
}

fn parse_record_attrs(attrs: &[syn::Attribute]) -> syn::Result<RecordAttrs> {
    let mut out = RecordAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("record")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                out.name = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("serde") {
                out.serde = true;
                Ok(())
            } else if meta.path.is_ident("default") {
                out.default = true;
                Ok(())
            } else {
                Err(meta.error("unsupported record attribute"))
            }
        })?;
    }
    Ok(out)
}

fn parse_field_rename(attrs: &[syn::Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("record")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                rename = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unsupported record field attribute"))
            }
        })?;
    }
    Ok(rename)
}

// Serde-mode records are keyed by Rust field name; a serde-level rename would
// make serde expect a key the mapping never carries.
fn reject_serde_rename(attrs: &[syn::Attribute], key: &str) -> syn::Result<()> {
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let syn::Meta::List(list) = &attr.meta else {
            continue;
        };
        let mentions_key = list
            .tokens
            .clone()
            .into_iter()
            .any(|tt| matches!(&tt, proc_macro2::TokenTree::Ident(ident) if ident == key));
        if mentions_key {
            return Err(syn::Error::new_spanned(
                attr,
                format!(
                    "`serde({})` is not supported on #[record(serde)] types; \
                     use #[record(rename = \"...\")] on the field instead",
                    key
                ),
            ));
        }
    }
    Ok(())
}

/// Derives the record capability traits (`Record`, `SqlType`, `ToSqlValue`,
/// `FromSqlValue`) for a struct with named fields.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &input.ident;
    let attrs = parse_record_attrs(&input.attrs)?;
    let record_name = attrs.name.clone().unwrap_or_else(|| ident.to_string());

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "Record can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                ident,
                "Record can only be derived for structs",
            ))
        }
    };

    if attrs.serde {
        reject_serde_rename(&input.attrs, "rename_all")?;
    }

    let mut descriptors = Vec::new();
    let mut to_fields = Vec::new();
    let mut takes = Vec::new();
    let mut serde_keys = Vec::new();

    for field in fields {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let rename = parse_field_rename(&field.attrs)?;
        if attrs.serde {
            reject_serde_rename(&field.attrs, "rename")?;
            if let Some(column) = &rename {
                let key = field_ident.unraw().to_string();
                serde_keys.push(quote! { (#column, #key) });
            }
        }
        let column = rename.unwrap_or_else(|| field_ident.unraw().to_string());

        descriptors.push(quote! {
            ::sql_test_runner::types::FieldDescriptor::new(
                #column,
                <#ty as ::sql_test_runner::types::SqlType>::type_descriptor(),
            )
        });
        to_fields.push(quote! {
            (
                #column.to_string(),
                ::sql_test_runner::types::ToSqlValue::to_sql_value(&self.#field_ident),
            )
        });
        takes.push(quote! {
            #field_ident: fields.take_as::<#ty>(#column)?
        });
    }

    let from_fields_body = if attrs.serde && !serde_keys.is_empty() {
        quote! {
            let mut fields = fields;
            fields.rekey(&[#(#serde_keys),*]);
            ::sql_test_runner::types::from_fields_via_serde::<Self>(fields)
        }
    } else if attrs.serde {
        quote! {
            ::sql_test_runner::types::from_fields_via_serde::<Self>(fields)
        }
    } else {
        quote! {
            let mut fields = fields;
            Ok(Self { #(#takes),* })
        }
    };

    let fallback = if attrs.default {
        quote! {
            fn fallback() -> Option<Self> {
                Some(<Self as ::std::default::Default>::default())
            }
        }
    } else {
        quote! {}
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::sql_test_runner::types::Record for #ident #ty_generics #where_clause {
            fn record_descriptor() -> ::sql_test_runner::types::RecordDescriptor {
                ::sql_test_runner::types::RecordDescriptor::new(#record_name, vec![#(#descriptors),*])
            }

            fn to_fields(&self) -> Vec<(String, ::sql_test_runner::types::SqlValue)> {
                vec![#(#to_fields),*]
            }

            fn from_fields(
                fields: ::sql_test_runner::types::FieldValues,
            ) -> ::sql_test_runner::Result<Self> {
                #from_fields_body
            }

            #fallback
        }

        impl #impl_generics ::sql_test_runner::types::SqlType for #ident #ty_generics #where_clause {
            fn type_descriptor() -> ::sql_test_runner::types::TypeDescriptor {
                ::sql_test_runner::types::TypeDescriptor::Record(
                    <Self as ::sql_test_runner::types::Record>::record_descriptor(),
                )
            }
        }

        impl #impl_generics ::sql_test_runner::types::ToSqlValue for #ident #ty_generics #where_clause {
            fn to_sql_value(&self) -> ::sql_test_runner::types::SqlValue {
                ::sql_test_runner::types::SqlValue::Record(
                    <Self as ::sql_test_runner::types::Record>::to_fields(self),
                )
            }
        }

        impl #impl_generics ::sql_test_runner::types::FromSqlValue for #ident #ty_generics #where_clause {
            fn from_sql_value(
                value: ::sql_test_runner::types::SqlValue,
            ) -> ::sql_test_runner::Result<Self> {
                ::sql_test_runner::types::record_from_value::<Self>(value)
            }
        }
    })
}
