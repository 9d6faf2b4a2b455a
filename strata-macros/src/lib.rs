mod decode_column;
mod decode_table;

use decode_column::{KeyRole, decode_column, encode_property};
use decode_table::decode_table;
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{ItemStruct, parse_macro_input};

#[proc_macro_derive(Entity, attributes(strata))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    let name = &item.ident;
    let table = decode_table(&item);
    let table_name = &table.name;
    let view = table.view;
    let sharding_rule = table
        .sharding_rule
        .as_ref()
        .map(|v| quote!(.sharding_rule(#v)));
    let mut ids = table.columns.iter().filter(|c| c.key != KeyRole::None);
    let Some(id) = ids.next() else {
        panic!(
            "Entity `{}` must mark its identity with `#[strata(id)]` or `#[strata(primary_key)]`",
            name
        );
    };
    if ids.next().is_some() {
        panic!(
            "Entity `{}` declares more than one identity field, group the key columns in a type deriving `EntityKey`",
            name
        );
    }
    let id_ident = &id.ident;
    let id_type = &id.ty;
    let properties = table.columns.iter().map(|column| match column.key {
        KeyRole::Composite => {
            let ident = &column.ident;
            let ty = &column.ty;
            let outer = format_ident!("__strata_{}", ident);
            let outer_mut = format_ident!("__strata_{}_mut", ident);
            quote! {
                .properties({
                    fn #outer(o: &#name) -> &#ty {
                        &o.#ident
                    }
                    fn #outer_mut(o: &mut #name) -> &mut #ty {
                        &mut o.#ident
                    }
                    <#ty as ::strata::EntityKey>::key_properties()
                        .into_iter()
                        .map(|p| p.project(#outer, #outer_mut))
                })
            }
        }
        KeyRole::Id => {
            let property = encode_property(column, name, true);
            quote!(.property(#property))
        }
        KeyRole::None => {
            let property = encode_property(column, name, false);
            quote!(.property(#property))
        }
    });
    quote! {
        impl ::strata::Entity for #name {
            type Id = #id_type;

            fn describe() -> ::strata::Result<::strata::EntityMeta<Self>> {
                ::strata::EntityMeta::<Self>::builder(#table_name)
                    .view(#view)
                    #sharding_rule
                    #(#properties)*
                    .build()
            }

            fn id(&self) -> &Self::Id {
                &self.#id_ident
            }
        }
    }
    .into()
}

/// Composite primary key: every field is a key column, in declaration order.
#[proc_macro_derive(EntityKey, attributes(strata))]
pub fn derive_entity_key(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    let name = &item.ident;
    let columns = item.fields.iter().map(decode_column).collect::<Vec<_>>();
    if columns.is_empty() {
        panic!("Key `{}` must have at least one field", name);
    }
    let properties = columns.iter().map(|c| encode_property(c, name, true));
    let values = columns.iter().map(|c| {
        let ident = &c.ident;
        quote!(::strata::AsValue::as_value(::std::clone::Clone::clone(&self.#ident)))
    });
    quote! {
        impl ::strata::EntityKey for #name {
            fn key_properties() -> Vec<::strata::PropertyMeta<Self>> {
                vec![#(#properties),*]
            }
        }

        impl ::strata::EntityId for #name {
            fn id_values(&self) -> Vec<::strata::Value> {
                vec![#(#values),*]
            }

            fn is_composite() -> bool {
                true
            }
        }
    }
    .into()
}
