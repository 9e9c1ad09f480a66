//! Stripe's bracketed form encoding.
//!
//! Stripe does not accept JSON request bodies. Nested values are flattened
//! into `application/x-www-form-urlencoded` pairs with bracketed keys:
//!
//! ```text
//! line_items[0][price]=price_123
//! line_items[0][quantity]=2
//! shipping_address_collection[allowed_countries][0]=US
//! metadata[printful_product_id]=42
//! ```
//!
//! [`FormBuilder`] collects those pairs in insertion order; the result is
//! passed to `reqwest::RequestBuilder::form`.

/// Ordered list of encoded form pairs.
pub type FormPairs = Vec<(String, String)>;

/// Builder for bracketed form pairs.
#[derive(Debug, Default, Clone)]
pub struct FormBuilder {
    pairs: FormPairs,
}

impl FormBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single `key=value` pair.
    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.pairs.push((key.into(), value.to_string()));
        self
    }

    /// Append a pair only when the value is present.
    pub fn push_opt<V: ToString>(&mut self, key: impl Into<String>, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.push(key, value);
        }
        self
    }

    /// Append `key[0]=a`, `key[1]=b`, ...
    pub fn push_list<I, V>(&mut self, key: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        for (i, value) in values.into_iter().enumerate() {
            self.push(format!("{key}[{i}]"), value);
        }
        self
    }

    /// Append `key[name]=value` for every metadata entry.
    pub fn push_map<'a, I>(&mut self, key: &str, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (name, value) in entries {
            self.push(format!("{key}[{name}]"), value);
        }
        self
    }

    /// Append every pair of `nested` under `prefix`, so `a=1` becomes
    /// `prefix[a]=1` and `a[b]=1` becomes `prefix[a][b]=1`.
    pub fn push_nested(&mut self, prefix: &str, nested: FormPairs) -> &mut Self {
        for (key, value) in nested {
            let key = match key.split_once('[') {
                Some((head, rest)) => format!("{prefix}[{head}][{rest}"),
                None => format!("{prefix}[{key}]"),
            };
            self.pairs.push((key, value));
        }
        self
    }

    /// Finish and return the pairs.
    #[must_use]
    pub fn build(self) -> FormPairs {
        self.pairs
    }
}

/// Look up the value of an encoded key (test and logging helper).
#[must_use]
pub fn value_of<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
