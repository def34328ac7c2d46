use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Error, Fields, GenericArgument, LitStr, PathArguments, Type,
};

// derive_model
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    match expand(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            other => {
                return Err(Error::new_spanned(
                    other,
                    "Model can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(Error::new_spanned(
                ident,
                "Model can only be derived for structs with named fields",
            ));
        }
    };

    let container = ContainerAttrs::parse(&input.attrs)?;
    let model_name = container.name.unwrap_or_else(|| ident.to_string());

    let rename_all = container_rename_rule(&input.attrs)?;

    let properties = fields
        .iter()
        .map(|field| {
            let serde_attrs = SerdeField::parse(&field.attrs)?;
            if serde_attrs.skip {
                return Ok(None);
            }

            let name = match serde_attrs.rename {
                Some(rename) => rename,
                None => match &field.ident {
                    Some(field_ident) => {
                        let raw = field_ident.to_string();
                        let raw = raw.trim_start_matches("r#");
                        match rename_all {
                            Some(rule) => rule.apply(raw),
                            None => raw.to_string(),
                        }
                    }
                    None => return Err(Error::new_spanned(field, "expected a named field")),
                },
            };

            let field_type = match field_type_override(&field.attrs)? {
                Some(field_type) => field_type,
                None => classify(&field.ty),
            };

            let variant = field_type.variant();
            Ok(Some(quote! {
                .field(#name, ::searchlayer::schema::FieldType::#variant)
            }))
        })
        .filter_map(Result::transpose)
        .collect::<syn::Result<Vec<_>>>()?;

    let definition = match container.id {
        Some(id) => quote! {
            ::searchlayer::schema::ModelDefinition::new(#model_name, properties).with_id_name(#id)
        },
        None => quote! {
            ::searchlayer::schema::ModelDefinition::new(#model_name, properties)
        },
    };

    Ok(quote! {
        impl #impl_generics ::searchlayer::schema::Model for #ident #ty_generics #where_clause {
            fn model_name() -> &'static str {
                #model_name
            }

            fn definition() -> ::searchlayer::schema::ModelDefinition {
                let properties = ::searchlayer::schema::PropertySchema::new()
                    #(#properties)*;

                #definition
            }
        }
    })
}

///
/// ContainerAttrs
///

#[derive(Default)]
struct ContainerAttrs {
    name: Option<String>,
    id: Option<String>,
}

impl ContainerAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();

        for attr in attrs.iter().filter(|attr| attr.path().is_ident("model")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    parsed.name = Some(meta.value()?.parse::<LitStr>()?.value());
                    Ok(())
                } else if meta.path.is_ident("id") {
                    parsed.id = Some(meta.value()?.parse::<LitStr>()?.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported model attribute, expected `name` or `id`"))
                }
            })?;
        }

        Ok(parsed)
    }
}

///
/// Kind
///

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    String,
    Number,
    Array,
    Other,
}

impl Kind {
    fn from_name(name: &LitStr) -> syn::Result<Self> {
        match name.value().to_ascii_lowercase().as_str() {
            "string" => Ok(Kind::String),
            "number" => Ok(Kind::Number),
            "array" => Ok(Kind::Array),
            "other" => Ok(Kind::Other),
            _ => Err(Error::new_spanned(
                name,
                "expected one of \"string\", \"number\", \"array\" or \"other\"",
            )),
        }
    }

    fn variant(self) -> TokenStream {
        match self {
            Kind::String => quote!(String),
            Kind::Number => quote!(Number),
            Kind::Array => quote!(Array),
            Kind::Other => quote!(Other),
        }
    }
}

fn field_type_override(attrs: &[Attribute]) -> syn::Result<Option<Kind>> {
    let mut kind = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("field_type") {
                kind = Some(Kind::from_name(&meta.value()?.parse::<LitStr>()?)?);
                Ok(())
            } else {
                Err(meta.error("unsupported model attribute, expected `field_type`"))
            }
        })?;
    }

    Ok(kind)
}

///
/// RenameRule
///

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn from_name(name: &LitStr) -> syn::Result<Self> {
        match name.value().as_str() {
            "lowercase" => Ok(RenameRule::Lower),
            "UPPERCASE" => Ok(RenameRule::Upper),
            "PascalCase" => Ok(RenameRule::Pascal),
            "camelCase" => Ok(RenameRule::Camel),
            "snake_case" => Ok(RenameRule::Snake),
            "SCREAMING_SNAKE_CASE" => Ok(RenameRule::ScreamingSnake),
            "kebab-case" => Ok(RenameRule::Kebab),
            "SCREAMING-KEBAB-CASE" => Ok(RenameRule::ScreamingKebab),
            _ => Err(Error::new_spanned(name, "unknown serde rename_all rule")),
        }
    }

    /// Converts a snake_case field name the way serde does for `rename_all`.
    fn apply(self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Pascal => {
                let mut pascal = String::with_capacity(field.len());
                let mut capitalize = true;
                for ch in field.chars() {
                    if ch == '_' {
                        capitalize = true;
                    } else if capitalize {
                        pascal.push(ch.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        pascal.push(ch);
                    }
                }
                pascal
            }
            RenameRule::Camel => {
                let pascal = RenameRule::Pascal.apply(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
        }
    }
}

// `rename(serialize = "..", deserialize = "..")` names the field by its serialized form
fn serialized_name(meta: &syn::meta::ParseNestedMeta) -> syn::Result<Option<LitStr>> {
    if meta.input.peek(syn::Token![=]) {
        return Ok(Some(meta.value()?.parse::<LitStr>()?));
    }

    let mut serialize = None;
    meta.parse_nested_meta(|nested| {
        let value = nested.value()?.parse::<LitStr>()?;
        if nested.path.is_ident("serialize") {
            serialize = Some(value);
        }
        Ok(())
    })?;

    Ok(serialize)
}

// serde keys we do not interpret still have to be consumed
fn skip_serde_meta(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        content.parse::<TokenStream>()?;
    }
    Ok(())
}

fn container_rename_rule(attrs: &[Attribute]) -> syn::Result<Option<RenameRule>> {
    let mut rule = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                if let Some(name) = serialized_name(&meta)? {
                    rule = Some(RenameRule::from_name(&name)?);
                }
                Ok(())
            } else {
                skip_serde_meta(&meta)
            }
        })?;
    }

    Ok(rule)
}

///
/// SerdeField
///

#[derive(Default)]
struct SerdeField {
    rename: Option<String>,
    skip: bool,
}

impl SerdeField {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();

        for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    if let Some(name) = serialized_name(&meta)? {
                        parsed.rename = Some(name.value());
                    }
                    Ok(())
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                    parsed.skip = true;
                    Ok(())
                } else {
                    skip_serde_meta(&meta)
                }
            })?;
        }

        Ok(parsed)
    }
}

const NUMBER_IDENTS: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize",
    "u8", "u16", "u32", "u64", "u128", "usize",
    "f32", "f64",
];

fn classify(ty: &Type) -> Kind {
    match ty {
        Type::Array(_) | Type::Slice(_) => Kind::Array,
        Type::Reference(reference) => classify(&reference.elem),
        Type::Group(group) => classify(&group.elem),
        Type::Paren(paren) => classify(&paren.elem),
        Type::Path(path) => {
            let Some(segment) = path.path.segments.last() else {
                return Kind::Other;
            };

            let ident = segment.ident.to_string();
            match ident.as_str() {
                "String" | "str" | "char" => Kind::String,
                "Vec" => Kind::Array,
                "Option" => match first_type_argument(&segment.arguments) {
                    Some(inner) => classify(inner),
                    None => Kind::Other,
                },
                number if NUMBER_IDENTS.contains(&number) => Kind::Number,
                _ => Kind::Other,
            }
        }
        _ => Kind::Other,
    }
}

fn first_type_argument(arguments: &PathArguments) -> Option<&Type> {
    let PathArguments::AngleBracketed(arguments) = arguments else {
        return None;
    };

    arguments.args.iter().find_map(|argument| match argument {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}
