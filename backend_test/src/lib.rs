use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject
/// dependencies, backed by a fresh in-memory incident store.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] and
/// `crate::store::Incidents`, the same store the client's server uses.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    if !args.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "`backend_test` takes no arguments",
        )
        .into_compile_error()
        .into();
    }

    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the injected arguments and reject invalid function signatures.
    let test_args = match check_sig(&item_fn.sig) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (rocket::local::asynchronous::Client, crate::store::Incidents) {
                let incidents = crate::store::Incidents::in_memory();
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_incidents(incidents.clone()),
                )
                .await
                .unwrap();
                (rocket_client, incidents)
            }

            /// The test itself.
            #item_fn

            // This test enters backend code, so enable logging.
            log4rs_test_utils::test_logging::init_logging_once_for(
                ["incident_board_backend"],
                None,
                None,
            );

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                #[allow(unused_variables)]
                let (rocket_client, incidents) = setup().await;
                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: &Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_incidents = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                // Match on the last segment, so both `Client` and a full path work.
                if let Some(segment) = type_path.path.segments.last() {
                    if segment.ident == "Client" {
                        if has_client {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                            ));
                        }
                        has_client = true;
                        args.push(quote! { rocket_client });
                        continue;
                    } else if segment.ident == "Incidents" {
                        if has_incidents {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `Incidents`",
                            ));
                        }
                        has_incidents = true;
                        args.push(quote! { incidents });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `incidents_ident: Incidents`",
        ));
    }

    Ok(args)
}
