//! The `#[test]` attribute re-exported by `trove-testhelpers`.

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Like the built-in `#[test]`, but the body starts with
/// `trove_testhelpers::setup()` so every test logs through the harness.
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();
    let body = match tokens.pop() {
        Some(TokenTree::Group(group)) if group.delimiter() == Delimiter::Brace => group,
        _ => {
            return "::core::compile_error!(\"#[test] expects a function with a body\");"
                .parse()
                .unwrap_or_default();
        }
    };

    let mut inner: TokenStream = "::trove_testhelpers::setup();"
        .parse()
        .unwrap_or_default();
    inner.extend(body.stream());
    let mut wrapped = Group::new(Delimiter::Brace, inner);
    wrapped.set_span(body.span());

    let mut output: TokenStream = "#[::core::prelude::v1::test]"
        .parse()
        .unwrap_or_default();
    output.extend(tokens);
    output.extend([TokenTree::Group(wrapped)]);
    output
}
