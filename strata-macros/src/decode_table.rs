use crate::decode_column::{ColumnMetadata, decode_column};
use convert_case::{Case, Casing};
use quote::ToTokens;
use syn::{Expr, ItemStruct, LitStr, parse::ParseBuffer};

pub(crate) struct TableMetadata {
    pub(crate) columns: Vec<ColumnMetadata>,
    pub(crate) name: String,
    pub(crate) view: bool,
    pub(crate) sharding_rule: Option<Expr>,
}

pub fn decode_table(item: &ItemStruct) -> TableMetadata {
    let columns = item.fields.iter().map(decode_column).collect();
    let mut name = item.ident.to_string().to_case(Case::Snake);
    if name.starts_with('_') {
        name.remove(0);
    }
    let mut view = false;
    let mut sharding_rule = None;
    for attr in &item.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("strata") {
            continue;
        }
        let Ok(list) = meta.require_list() else {
            panic!("Error while parsing `strata`, use it like: `#[strata(attribute = value, ..)]`");
        };
        let _ = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("table_name") {
                let Ok(value) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!(
                        "Error while parsing `table_name`, use it like: `#[strata(table_name = \"my_table\")]`"
                    );
                };
                name = value.value();
            } else if arg.path.is_ident("view") {
                let Err(..) = arg.value() else {
                    panic!("Error while parsing `view`, use it like: `#[strata(view)]`");
                };
                view = true;
            } else if arg.path.is_ident("sharding_rule") {
                let Ok(value) = arg.value().and_then(ParseBuffer::parse::<Expr>) else {
                    panic!(
                        "Error while parsing `sharding_rule`, use it like: `#[strata(sharding_rule = ModuloShardingRule::new(4))]`"
                    );
                };
                sharding_rule = Some(value);
            } else {
                panic!(
                    "Unknown attribute `{}` inside strata macro",
                    arg.path.to_token_stream()
                );
            }
            Ok(())
        });
    }
    TableMetadata {
        columns,
        name,
        view,
        sharding_rule,
    }
}
