/// Integration tests for schema composition
///
/// These tests verify that the composer can:
/// - Merge independently authored fragments and resolver maps
/// - Execute queries, mutations and subscriptions against the result
/// - Reject duplicate, missing and malformed definitions before serving

mod composition_tests {
    use futures_util::StreamExt;
    use schemaweave::{
        compose, CompositionError, Composer, PubSub, RequestContext, ResolverMap, TypeFragment,
    };
    use serde_json::{json, Map, Value};
    use std::time::Duration;

    fn author_fragment() -> TypeFragment {
        TypeFragment::new(
            "author.graphql",
            r#"
type Author {
  firstName: String
  lastName: String
}

type AuthorResult {
  authors: [Author]
}
"#,
        )
    }

    fn query_fragment() -> TypeFragment {
        TypeFragment::new(
            "query.graphql",
            r#"
type Query {
  getAuthors: AuthorResult
}
"#,
        )
    }

    fn authors_resolvers() -> ResolverMap {
        ResolverMap::new("authors").value(
            "Query",
            "getAuthors",
            json!({ "authors": [{ "firstName": "Hao", "lastName": "Luong" }] }),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_author_query() {
        let _ = tracing_subscriber::fmt::try_init();

        let schema = compose(&[author_fragment(), query_fragment()], [authors_resolvers()])
            .expect("Failed to compose schema");

        let response = schema
            .execute("{ getAuthors { authors { firstName lastName } } }")
            .await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"data":{"getAuthors":{"authors":[{"firstName":"Hao","lastName":"Luong"}]}}}"#
        );
    }

    #[test]
    fn test_composed_schema_declares_every_fragment_type() {
        let schema = compose(&[author_fragment(), query_fragment()], [authors_resolvers()])
            .expect("Failed to compose schema");

        let names: Vec<&str> = schema.type_names().iter().map(String::as_str).collect();
        assert_eq!(names, vec!["Author", "AuthorResult", "Query"]);

        let sdl = schema.sdl();
        assert!(sdl.contains("type Author"));
        assert!(sdl.contains("getAuthors: AuthorResult"));
        assert!(schema.merged_document().contains("type AuthorResult"));
    }

    #[tokio::test]
    async fn test_composition_is_repeatable() {
        let fragments = [author_fragment(), query_fragment()];

        let first = compose(&fragments, [authors_resolvers()]).unwrap();
        let second = compose(&fragments, [authors_resolvers()]).unwrap();

        assert_eq!(first.sdl(), second.sdl());
        assert_eq!(first.type_names(), second.type_names());
        assert_eq!(first.merged_document(), second.merged_document());

        for query in ["{ getAuthors { authors { firstName lastName } } }", "{ nope }"] {
            let a = serde_json::to_value(first.execute(query).await).unwrap();
            let b = serde_json::to_value(second.execute(query).await).unwrap();
            assert_eq!(a, b, "Schemas disagree on {}", query);
        }

        let rejected = second.execute("{ nope }").await;
        assert!(!rejected.errors.is_empty());
    }

    #[test]
    fn test_duplicate_resolver_across_maps() {
        let result = compose(
            &[author_fragment(), query_fragment()],
            [
                authors_resolvers(),
                ResolverMap::new("more-authors").value("Query", "getAuthors", json!(null)),
            ],
        );

        assert_eq!(
            result.unwrap_err(),
            CompositionError::DuplicateResolver {
                type_name: "Query".to_string(),
                field_name: "getAuthors".to_string(),
                first: "authors".to_string(),
                second: "more-authors".to_string(),
            }
        );
    }

    #[test]
    fn test_unresolved_root_field() {
        let result = compose(&[author_fragment(), query_fragment()], Vec::<ResolverMap>::new());

        assert_eq!(
            result.unwrap_err(),
            CompositionError::UnresolvedField {
                type_name: "Query".to_string(),
                field_name: "getAuthors".to_string(),
                origin: "query.graphql".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_root_value_resolves_unbound_root_field() {
        let schema = Composer::new()
            .root_value(json!({
                "getAuthors": { "authors": [{ "firstName": "Ada", "lastName": "Lovelace" }] }
            }))
            .compose(&[author_fragment(), query_fragment()], Vec::<ResolverMap>::new())
            .expect("Root value property should satisfy getAuthors");

        let response = schema.execute("{ getAuthors { authors { lastName } } }").await;
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({ "getAuthors": { "authors": [{ "lastName": "Lovelace" }] } })
        );
    }

    #[test]
    fn test_malformed_fragment_names_its_origin() {
        let broken = TypeFragment::new("broken.graphql", "type Query {\n  getAuthors: AuthorResult\n");

        let err = compose(&[author_fragment(), broken], [authors_resolvers()]).unwrap_err();

        match err {
            CompositionError::SchemaParse { origin, .. } => assert_eq!(origin, "broken.graphql"),
            other => panic!("Expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_orphan_resolver() {
        let result = compose(
            &[author_fragment(), query_fragment()],
            [authors_resolvers().value("Query", "getBooks", json!([]))],
        );

        assert!(matches!(
            result,
            Err(CompositionError::OrphanResolver { ref field_name, .. }) if field_name == "getBooks"
        ));
    }

    #[tokio::test]
    async fn test_field_resolver_sees_parent_and_args() {
        let fragments = [
            author_fragment(),
            TypeFragment::new(
                "greeting.graphql",
                r#"
extend type Author {
  fullName(separator: String = " "): String
}

type Query {
  greet(name: String = "world"): String
  author: Author
}
"#,
            ),
        ];

        let resolvers = ResolverMap::new("greeting")
            .field("Query", "greet", |ctx| async move {
                let name = ctx.arg("name").and_then(Value::as_str).unwrap_or_default();
                Ok(json!(format!("hello {}", name)))
            })
            .value("Query", "author", json!({ "firstName": "Hao", "lastName": "Luong" }))
            .field("Author", "fullName", |ctx| async move {
                let part = |name: &str| {
                    ctx.parent
                        .get(name)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                let separator = ctx.arg("separator").and_then(Value::as_str).unwrap_or_default();
                Ok(json!(format!("{}{}{}", part("firstName"), separator, part("lastName"))))
            });

        let schema = compose(&fragments, [resolvers]).expect("Failed to compose schema");

        let response = schema
            .execute(r#"{ a: greet b: greet(name: "Hao") author { fullName c: fullName(separator: ", ") } }"#)
            .await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({
                "a": "hello world",
                "b": "hello Hao",
                "author": { "fullName": "Hao Luong", "c": "Hao, Luong" }
            })
        );
    }

    #[tokio::test]
    async fn test_resolver_error_is_reported_on_field() {
        let schema = compose(
            &[TypeFragment::new("q.graphql", "type Query { fail: String ok: String }")],
            [ResolverMap::new("q")
                .field("Query", "fail", |_ctx| async move {
                    Err::<Value, _>(async_graphql::Error::new("boom"))
                })
                .value("Query", "ok", json!("fine"))],
        )
        .unwrap();

        let response = schema.execute("{ fail ok }").await;

        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "boom");
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({ "fail": null, "ok": "fine" })
        );
    }

    #[tokio::test]
    async fn test_interfaces_unions_and_enums() {
        let fragments = [
            TypeFragment::new(
                "works.graphql",
                r#"
enum Genre {
  FICTION
  POETRY
}

interface Named {
  name: String
}

type Writer implements Named {
  name: String
  genre: Genre
}

type Publisher implements Named {
  name: String
  city: String
}

union Contributor = Writer | Publisher
"#,
            ),
            TypeFragment::new(
                "query.graphql",
                "type Query { named: [Named] contributors: [Contributor] }",
            ),
        ];

        let entries = json!([
            { "__typename": "Writer", "name": "Hao", "genre": "POETRY" },
            { "__typename": "Publisher", "name": "Acme", "city": "Hanoi" }
        ]);
        let resolvers = ResolverMap::new("works")
            .value("Query", "named", entries.clone())
            .value("Query", "contributors", entries);

        let schema = compose(&fragments, [resolvers]).expect("Failed to compose schema");
        let response = schema
            .execute(
                r#"{
                    named { __typename name }
                    contributors {
                        ... on Writer { genre }
                        ... on Publisher { city }
                    }
                }"#,
            )
            .await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({
                "named": [
                    { "__typename": "Writer", "name": "Hao" },
                    { "__typename": "Publisher", "name": "Acme" }
                ],
                "contributors": [{ "genre": "POETRY" }, { "city": "Hanoi" }]
            })
        );
    }

    #[tokio::test]
    async fn test_date_scalar_validates_input() {
        let schema = compose(
            &[TypeFragment::new(
                "dates.graphql",
                "scalar Date\ntype Query { echo(date: Date!): Date }",
            )],
            [ResolverMap::new("dates").field("Query", "echo", |ctx| async move {
                Ok(ctx.arg("date").cloned().unwrap_or(Value::Null))
            })],
        )
        .unwrap();

        let ok = schema.execute(r#"{ echo(date: "2024-01-15") }"#).await;
        assert!(ok.errors.is_empty(), "{:?}", ok.errors);
        assert_eq!(ok.data.into_json().unwrap(), json!({ "echo": "2024-01-15" }));

        let invalid = schema.execute(r#"{ echo(date: "yesterday") }"#).await;
        assert!(!invalid.errors.is_empty());
    }

    #[tokio::test]
    async fn test_request_context_reaches_resolvers() {
        let schema = compose(
            &[TypeFragment::new("me.graphql", "type Query { whoami: String }")],
            [ResolverMap::new("me").field("Query", "whoami", |ctx| async move {
                Ok(json!(ctx.context.header("X-User")))
            })],
        )
        .unwrap();

        let mut values = Map::new();
        values.insert("headers".to_string(), json!({ "x-user": "hao" }));

        let response = schema
            .execute_with_context("{ whoami }", RequestContext::new(values))
            .await;
        assert_eq!(response.data.into_json().unwrap(), json!({ "whoami": "hao" }));

        let anonymous = schema.execute("{ whoami }").await;
        assert_eq!(anonymous.data.into_json().unwrap(), json!({ "whoami": null }));
    }

    #[tokio::test]
    async fn test_mutation_publishes_to_subscription() {
        let pubsub = PubSub::new(16);
        let publisher = pubsub.clone();
        let subscriber = pubsub.clone();

        let fragments = [
            author_fragment(),
            query_fragment(),
            TypeFragment::new(
                "subscription.graphql",
                r#"
type Mutation {
  addAuthor(firstName: String!, lastName: String!): Author
}

type Subscription {
  authorAdded: Author
}
"#,
            ),
        ];
        let resolvers = authors_resolvers()
            .field("Mutation", "addAuthor", move |ctx| {
                let author = Value::Object(ctx.args);
                publisher.publish("AUTHOR_ADDED", author.clone());
                async move { Ok(author) }
            })
            .subscription("Subscription", "authorAdded", move |_ctx| {
                subscriber.subscribe("AUTHOR_ADDED")
            });

        let schema = compose(&fragments, [resolvers]).expect("Failed to compose schema");
        let mut stream = schema.execute_stream(
            "subscription { authorAdded { firstName lastName } }",
            RequestContext::default(),
        );

        let publish = async {
            while pubsub.subscriber_count() == 0 {
                tokio::task::yield_now().await;
            }
            schema
                .execute(r#"mutation { addAuthor(firstName: "Hao", lastName: "Luong") { firstName } }"#)
                .await
        };

        let (event, mutation) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(stream.next(), publish)
        })
        .await
        .expect("Subscription did not receive the published author");

        assert!(mutation.errors.is_empty(), "{:?}", mutation.errors);
        let event = event.expect("Stream ended early");
        assert!(event.errors.is_empty(), "{:?}", event.errors);
        assert_eq!(
            event.data.into_json().unwrap(),
            json!({ "authorAdded": { "firstName": "Hao", "lastName": "Luong" } })
        );
    }
}
