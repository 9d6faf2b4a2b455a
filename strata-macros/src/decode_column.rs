use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{Field, GenericArgument, Ident, LitStr, PathArguments, Type, parse::ParseBuffer};

/// Role of a field in the identity of its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyRole {
    None,
    /// Single column identity.
    Id,
    /// Field holding a composite key object, its own fields are the key columns.
    Composite,
}

pub(crate) struct ColumnMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    pub(crate) name: String,
    pub(crate) nullable: bool,
    pub(crate) readonly: bool,
    pub(crate) default: Option<String>,
    pub(crate) key: KeyRole,
    pub(crate) auto_increment: bool,
    pub(crate) sequence: Option<String>,
}

fn is_option(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    path.path.segments.last().is_some_and(|v| {
        v.ident == "Option"
            && matches!(
                &v.arguments,
                PathArguments::AngleBracketed(args)
                    if matches!(args.args.first(), Some(GenericArgument::Type(..)))
            )
    })
}

fn flag(arg: &syn::meta::ParseNestedMeta, name: &str) {
    // value() is Err for a bare path
    let Err(..) = arg.value() else {
        panic!("Error while parsing `{name}`, use it like: `#[strata({name})]`");
    };
}

fn string(arg: &syn::meta::ParseNestedMeta, name: &str) -> String {
    let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
        panic!("Error while parsing `{name}`, use it like: `#[strata({name} = \"value\")]`");
    };
    v.value()
}

pub fn decode_column(field: &Field) -> ColumnMetadata {
    let ident = field
        .ident
        .clone()
        .expect("Field is expected to have a name");
    let mut name = ident.to_string();
    if name.starts_with('_') {
        name.remove(0);
    }
    let mut metadata = ColumnMetadata {
        ident,
        ty: field.ty.clone(),
        name,
        nullable: is_option(&field.ty),
        readonly: false,
        default: None,
        key: KeyRole::None,
        auto_increment: false,
        sequence: None,
    };
    for attr in &field.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("strata") {
            continue;
        }
        let Ok(list) = meta.require_list() else {
            panic!("Error while parsing `strata`, use it like: `#[strata(attribute = value, ...)]`");
        };
        let _ = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("column_name") {
                metadata.name = string(&arg, "column_name");
            } else if arg.path.is_ident("id") {
                flag(&arg, "id");
                metadata.key = KeyRole::Id;
            } else if arg.path.is_ident("primary_key") {
                flag(&arg, "primary_key");
                metadata.key = KeyRole::Composite;
            } else if arg.path.is_ident("auto_increment") {
                flag(&arg, "auto_increment");
                metadata.auto_increment = true;
            } else if arg.path.is_ident("sequence") {
                metadata.sequence = Some(string(&arg, "sequence"));
            } else if arg.path.is_ident("readonly") {
                flag(&arg, "readonly");
                metadata.readonly = true;
            } else if arg.path.is_ident("nullable") {
                flag(&arg, "nullable");
                metadata.nullable = true;
            } else if arg.path.is_ident("not_null") {
                flag(&arg, "not_null");
                metadata.nullable = false;
            } else if arg.path.is_ident("default") {
                metadata.default = Some(string(&arg, "default"));
            } else {
                panic!(
                    "Unknown attribute `{}` inside strata macro",
                    arg.path.to_token_stream()
                );
            }
            Ok(())
        });
    }
    if metadata.auto_increment && !is_option(&field.ty) {
        panic!(
            "Field `{}` is auto_increment and must be an Option, use it like: `#[strata(id, auto_increment)] {}: Option<i64>`",
            metadata.ident, metadata.ident
        );
    }
    if metadata.key == KeyRole::Id {
        metadata.nullable = false;
    }
    metadata
}

/// `PropertyMeta<owner>` expression for a plain column.
pub(crate) fn encode_property(
    column: &ColumnMetadata,
    owner: &Ident,
    primary_key: bool,
) -> TokenStream {
    let ident = &column.ident;
    let ty = &column.ty;
    let name = &column.name;
    let field = ident.to_string();
    let nullable = column.nullable;
    let readonly = column.readonly;
    let auto_increment = column.auto_increment;
    let default = column
        .default
        .as_ref()
        .map(|v| quote!(.default_literal(#v)));
    let sequence = column.sequence.as_ref().map(|v| quote!(.sequence(#v)));
    quote! {
        ::strata::PropertyMeta::new(
            ::strata::ColumnMeta::new(
                #name,
                #field,
                <#ty as ::strata::AsValue>::as_empty_value(),
            )
            .nullable(#nullable)
            .readonly(#readonly)
            .primary_key(#primary_key)
            .auto_increment(#auto_increment)
            #default
            #sequence,
            |e: &#owner| ::strata::AsValue::as_value(::std::clone::Clone::clone(&e.#ident)),
            |e: &mut #owner, v: ::strata::Value| {
                e.#ident = <#ty as ::strata::AsValue>::try_from_value(v)?;
                Ok(())
            },
        )
    }
}
