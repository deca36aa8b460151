use schemaweave::config::{Config, ResolverConfig, SchemaConfig, ServerConfig};
use serde_json::json;

/// An example schema fragment and where `init` writes it
pub struct ExampleFragment {
    pub path: &'static str,
    pub description: &'static str,
    pub source: &'static str,
}

pub const AUTHOR_SDL: &str = r#"type Author {
  firstName: String
  lastName: String
}

type AuthorResult {
  authors: [Author]
}
"#;

pub const QUERY_SDL: &str = r#"type Query {
  getAuthors: AuthorResult
}
"#;

pub const SUBSCRIPTION_SDL: &str = r#"type Mutation {
  addAuthor(firstName: String!, lastName: String!): Author
}

type Subscription {
  authorAdded: Author
}
"#;

/// Fragments of the author example, in composition order
pub fn example_fragments() -> Vec<ExampleFragment> {
    vec![
        ExampleFragment {
            path: "schema/author.graphql",
            description: "Author and AuthorResult object types",
            source: AUTHOR_SDL,
        },
        ExampleFragment {
            path: "schema/query.graphql",
            description: "Query root with getAuthors",
            source: QUERY_SDL,
        },
        ExampleFragment {
            path: "schema/subscription.graphql",
            description: "addAuthor mutation and authorAdded subscription",
            source: SUBSCRIPTION_SDL,
        },
    ]
}

/// Configuration wiring the example fragments to resolvers
pub fn create_example_config() -> Config {
    Config {
        server: ServerConfig::default(),
        schema: SchemaConfig {
            fragments: example_fragments()
                .iter()
                .map(|fragment| fragment.path.to_string())
                .collect(),
            root_value: None,
        },
        resolver: vec![
            ResolverConfig {
                field: "Query.getAuthors".to_string(),
                value: Some(json!({
                    "authors": [{ "firstName": "Hao", "lastName": "Luong" }]
                })),
                ..Default::default()
            },
            ResolverConfig {
                field: "Mutation.addAuthor".to_string(),
                publish: Some("AUTHOR_ADDED".to_string()),
                ..Default::default()
            },
            ResolverConfig {
                field: "Subscription.authorAdded".to_string(),
                subscribe: Some("AUTHOR_ADDED".to_string()),
                ..Default::default()
            },
        ],
    }
}
