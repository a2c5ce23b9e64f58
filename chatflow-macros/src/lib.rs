use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, ItemFn};

/// Registers a step function in the `chatflow_core` handler catalog.
///
/// The function takes `(chat_id: &str, user_input: &Value, context: Context,
/// sender: &dyn MessageSender)` and returns `StepResult`; it may be `async`.
/// It is addressable as `<module_path>.<fn_name>` unless `path = "a.b.name"`
/// is given.
#[proc_macro_attribute]
pub fn step(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);
    type MetaList = syn::punctuated::Punctuated<syn::Meta, syn::Token![,]>;
    let attr_metas = syn::parse_macro_input!(attr with MetaList::parse_terminated);

    let fn_name = &input_fn.sig.ident;
    let fn_name_str = fn_name.to_string();
    let struct_name = format_ident!("{}Step", camel_case(&fn_name_str));
    let ctor_name = format_ident!("__chatflow_step_ctor_{}", fn_name);

    if input_fn.sig.inputs.len() != 4 {
        return syn::Error::new_spanned(
            &input_fn.sig.inputs,
            "step functions take exactly 4 arguments: (chat_id, user_input, context, sender)",
        )
        .to_compile_error()
        .into();
    }

    let mut explicit_path: Option<(String, String)> = None;
    for meta in attr_metas {
        let syn::Meta::NameValue(nv) = meta else {
            continue;
        };
        if !nv.path.is_ident("path") {
            continue;
        }
        if let syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) = &nv.value
        {
            let value = lit.value().replace("::", ".");
            match value.rsplit_once('.') {
                Some((module, name)) if !module.is_empty() && !name.is_empty() => {
                    explicit_path = Some((module.to_string(), name.to_string()));
                }
                _ => {
                    return syn::Error::new_spanned(
                        lit,
                        "step path must look like 'module.function_name'",
                    )
                    .to_compile_error()
                    .into();
                }
            }
        }
    }

    let (module_tokens, name_str) = match explicit_path {
        Some((module, name)) => (quote!(#module), name),
        None => (quote!(::core::module_path!()), fn_name_str),
    };

    let call = if input_fn.sig.asyncness.is_some() {
        quote!(#fn_name(chat_id, user_input, context, sender).await)
    } else {
        quote!(#fn_name(chat_id, user_input, context, sender))
    };

    let vis = &input_fn.vis;
    let expanded = quote! {
        #input_fn

        #vis struct #struct_name;

        #[::chatflow_core::async_trait]
        impl ::chatflow_core::StepHandler for #struct_name {
            async fn handle(
                &self,
                chat_id: &str,
                user_input: &::chatflow_core::Value,
                context: ::chatflow_core::Context,
                sender: &dyn ::chatflow_core::MessageSender,
            ) -> ::chatflow_core::StepResult {
                #call
            }
        }

        #[doc(hidden)]
        #[allow(non_snake_case)]
        fn #ctor_name() -> ::std::sync::Arc<dyn ::chatflow_core::StepHandler> {
            ::std::sync::Arc::new(#struct_name)
        }

        ::chatflow_core::inventory::submit! {
            ::chatflow_core::CatalogEntry::new(#module_tokens, #name_str, #ctor_name)
        }
    };

    TokenStream::from(expanded)
}

fn camel_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
