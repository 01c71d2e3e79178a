//! # Graphcode Derive Macros
//!
//! This crate provides the procedural macros for `graphcode`.
//!
//! * `#[derive(Archivable)]` implements `ArchiveFields`, `Archivable` and
//!   `Constructible` for structs with named fields.
//! * `#[derive(ArchiveEnum)]` implements `ArchiveEnum` and `Field` for
//!   fieldless enums.
//!
//! Compatible with `syn 2.0`.
//!
//! ## Attributes
//!
//! Container: `#[archive(class = "ns::Name")]`, `#[archive(version = 2)]`,
//! `#[archive(embedded)]` (only `ArchiveFields`, for by-value members).
//!
//! Field: `name = "..."`, `skip`, `ctor`, `object`, `track`, `polymorphic`,
//! `shared = "Type"`, `serde`.
//!
//! Fields that are not constructor arguments start out at `Default::default()`
//! before being read, so reference fields must be `Option<Handle>` or vectors;
//! a bare `Handle` field needs a hand-written `Constructible`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitInt, LitStr, parse_macro_input};

/// Derives `ArchiveFields`, `Archivable` and `Constructible`.
#[proc_macro_derive(Archivable, attributes(archive))]
pub fn derive_archivable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_archivable(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derives `ArchiveEnum` and `Field` for a fieldless enum.
#[proc_macro_derive(ArchiveEnum)]
pub fn derive_archive_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_enum(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

// --- Internal Data Structures ---

struct ContainerAttrs {
    class: Option<String>,
    version: Option<i32>,
    embedded: bool,
}

#[derive(Clone)]
enum FieldKind {
    /// Written through `Field`.
    Value,
    /// Embedded object written through its own `ArchiveFields`.
    Object { track: bool },
    /// Reference resolved through the class factory.
    Polymorphic,
    /// Reference to a statically known type.
    Shared(syn::Type),
    /// Any serde type, stored as a blob.
    Serde,
}

struct FieldSpec {
    ident: syn::Ident,
    ty: syn::Type,
    name: String,
    kind: FieldKind,
    ctor: bool,
    skip: bool,
}

fn parse_container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut parsed = ContainerAttrs {
        class: None,
        version: None,
        embedded: false,
    };

    for attr in attrs {
        if !attr.path().is_ident("archive") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("class") {
                let s: LitStr = meta.value()?.parse()?;
                let class = s.value();
                if class.is_empty() || class == "oID" {
                    return Err(meta.error("class name is reserved by the archive format"));
                }
                parsed.class = Some(class);
                return Ok(());
            }
            if meta.path.is_ident("version") {
                let v: LitInt = meta.value()?.parse()?;
                parsed.version = Some(v.base10_parse()?);
                return Ok(());
            }
            if meta.path.is_ident("embedded") {
                parsed.embedded = true;
                return Ok(());
            }
            Err(meta.error("Unknown archive attribute key. Supported: class, version, embedded"))
        })?;
    }
    Ok(parsed)
}

fn parse_field(field: &syn::Field) -> syn::Result<FieldSpec> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| syn::Error::new_spanned(field, "Archivable requires named fields"))?;

    let mut name = ident.to_string();
    let mut kind = FieldKind::Value;
    let mut track = false;
    let mut ctor = false;
    let mut skip = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("archive") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let s: LitStr = meta.value()?.parse()?;
                name = s.value();
                return Ok(());
            }
            if meta.path.is_ident("skip") {
                skip = true;
                return Ok(());
            }
            if meta.path.is_ident("ctor") {
                ctor = true;
                return Ok(());
            }
            if meta.path.is_ident("object") {
                kind = FieldKind::Object { track: false };
                return Ok(());
            }
            if meta.path.is_ident("track") {
                track = true;
                return Ok(());
            }
            if meta.path.is_ident("polymorphic") {
                kind = FieldKind::Polymorphic;
                return Ok(());
            }
            if meta.path.is_ident("shared") {
                let s: LitStr = meta.value()?.parse()?;
                kind = FieldKind::Shared(s.parse()?);
                return Ok(());
            }
            if meta.path.is_ident("serde") {
                kind = FieldKind::Serde;
                return Ok(());
            }
            Err(meta.error(
                "Unknown archive attribute key. Supported: name, skip, ctor, object, track, polymorphic, shared, serde",
            ))
        })?;
    }

    if track {
        match kind {
            FieldKind::Object { .. } => kind = FieldKind::Object { track: true },
            _ => {
                return Err(syn::Error::new_spanned(
                    &ident,
                    "`track` only applies to `object` fields",
                ));
            }
        }
    }
    if skip && ctor {
        return Err(syn::Error::new_spanned(&ident, "a field cannot be both `skip` and `ctor`"));
    }

    Ok(FieldSpec {
        ident,
        ty: field.ty.clone(),
        name,
        kind,
        ctor,
        skip,
    })
}

// --- Generator: statements ---

fn write_stmt(field: &FieldSpec, target: &TokenStream2) -> TokenStream2 {
    let name = &field.name;
    match &field.kind {
        FieldKind::Value => quote! { ar.write(graphcode::nvp(#name, &#target))?; },
        FieldKind::Object { track } => {
            let flags = if *track { quote! { .tracked() } } else { quote! {} };
            quote! { ar.write_object(graphcode::nvp(#name, &#target)#flags)?; }
        }
        FieldKind::Polymorphic => quote! { ar.write_polymorphic_ref(graphcode::nvp(#name, &#target))?; },
        FieldKind::Shared(_) => quote! { ar.write_ref(graphcode::nvp(#name, &#target))?; },
        FieldKind::Serde => quote! { ar.write_serde(graphcode::nvp(#name, &#target))?; },
    }
}

fn read_stmt(field: &FieldSpec, target: &TokenStream2) -> TokenStream2 {
    let name = &field.name;
    match &field.kind {
        FieldKind::Value => quote! { ar.read(graphcode::nvp(#name, &mut #target))?; },
        FieldKind::Object { track } => {
            let flags = if *track { quote! { .tracked() } } else { quote! {} };
            quote! { ar.read_object(graphcode::nvp(#name, &mut #target)#flags)?; }
        }
        FieldKind::Polymorphic => {
            quote! { ar.read_polymorphic_ref(graphcode::nvp(#name, &mut #target))?; }
        }
        FieldKind::Shared(ty) => {
            quote! { ar.read_ref::<#ty, _>(graphcode::nvp(#name, &mut #target))?; }
        }
        FieldKind::Serde => quote! { ar.read_serde(graphcode::nvp(#name, &mut #target))?; },
    }
}

// --- Generator: Archivable ---

fn expand_archivable(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let container = parse_container_attrs(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(ds) => match &ds.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new(
                    name.span(),
                    "Archivable only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(name.span(), "Archivable only supports structs"));
        }
    };
    let specs = fields.iter().map(parse_field).collect::<syn::Result<Vec<_>>>()?;

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let self_target = |field: &FieldSpec| {
        let ident = &field.ident;
        quote! { self.#ident }
    };

    let body_fields = specs.iter().filter(|s| !s.skip && !s.ctor);
    let write_fields: Vec<_> = body_fields
        .clone()
        .map(|s| write_stmt(s, &self_target(s)))
        .collect();
    let read_fields: Vec<_> = body_fields.map(|s| read_stmt(s, &self_target(s))).collect();

    let (write_version, read_version) = match container.version {
        Some(v) => (
            quote! { ar.write_version(#v)?; },
            quote! { let _version = ar.read_version()?; },
        ),
        None => (quote! {}, quote! {}),
    };

    let impl_fields = quote! {
        #[allow(unused_variables)]
        impl #impl_generics graphcode::ArchiveFields for #name #ty_generics #where_clause {
            fn write_fields(&self, ar: &mut graphcode::OutputArchive<'_>) -> graphcode::Result<()> {
                #write_version
                #(#write_fields)*
                Ok(())
            }

            fn read_fields(&mut self, ar: &mut graphcode::InputArchive<'_>) -> graphcode::Result<()> {
                #read_version
                #(#read_fields)*
                Ok(())
            }
        }
    };

    if container.embedded {
        if specs.iter().any(|s| s.ctor) {
            return Err(syn::Error::new(
                name.span(),
                "`ctor` fields need a constructor; remove `embedded`",
            ));
        }
        return Ok(impl_fields);
    }

    let class = container.class.unwrap_or_else(|| name.to_string());

    let ctor_specs: Vec<_> = specs.iter().filter(|s| s.ctor).collect();
    let write_ctor: Vec<_> = ctor_specs
        .iter()
        .map(|s| write_stmt(s, &self_target(s)))
        .collect();
    let read_ctor: Vec<_> = ctor_specs
        .iter()
        .map(|s| {
            let ident = &s.ident;
            let ty = &s.ty;
            let read = read_stmt(s, &quote! { #ident });
            quote! {
                let mut #ident: #ty = ::core::default::Default::default();
                #read
            }
        })
        .collect();
    let init: Vec<_> = specs
        .iter()
        .map(|s| {
            let ident = &s.ident;
            if s.ctor {
                quote! { #ident }
            } else {
                quote! { #ident: ::core::default::Default::default() }
            }
        })
        .collect();

    Ok(quote! {
        #impl_fields

        #[allow(unused_variables)]
        impl #impl_generics graphcode::Archivable for #name #ty_generics #where_clause {
            fn class_name(&self) -> &'static str {
                #class
            }

            fn write_constructor_args(&self, ar: &mut graphcode::OutputArchive<'_>) -> graphcode::Result<()> {
                #(#write_ctor)*
                Ok(())
            }
        }

        #[allow(unused_variables)]
        impl #impl_generics graphcode::Constructible for #name #ty_generics #where_clause {
            const CLASS_NAME: &'static str = #class;

            fn construct(ar: &mut graphcode::InputArchive<'_>) -> graphcode::Result<Self> {
                #(#read_ctor)*
                Ok(Self { #(#init),* })
            }
        }
    })
}

// --- Generator: ArchiveEnum ---

fn expand_enum(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let data = match &input.data {
        Data::Enum(data) => data,
        _ => return Err(syn::Error::new(name.span(), "ArchiveEnum only supports enums")),
    };

    let mut variants = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "ArchiveEnum only supports fieldless variants",
            ));
        }
        variants.push(&variant.ident);
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics graphcode::ArchiveEnum for #name #ty_generics #where_clause {
            fn to_i32(&self) -> i32 {
                match self {
                    #(Self::#variants => Self::#variants as i32,)*
                }
            }

            fn from_i32(value: i32) -> ::core::option::Option<Self> {
                #(
                    if value == Self::#variants as i32 {
                        return ::core::option::Option::Some(Self::#variants);
                    }
                )*
                ::core::option::Option::None
            }
        }

        impl #impl_generics graphcode::Field for #name #ty_generics #where_clause {
            fn write_field(&self, ar: &mut graphcode::OutputArchive<'_>, name: &str) -> graphcode::Result<()> {
                ar.write_enum(graphcode::nvp(name, self))
            }

            fn read_field(&mut self, ar: &mut graphcode::InputArchive<'_>, name: &str) -> graphcode::Result<()> {
                ar.read_enum(graphcode::nvp(name, self))
            }
        }
    })
}
