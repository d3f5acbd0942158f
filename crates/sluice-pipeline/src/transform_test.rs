use super::*;
use serde_json::json;

fn now() -> DateTime<Utc> {
    Utc::now()
}

fn raw_user() -> Value {
    json!({
        "id": 1,
        "name": "  Leanne Graham ",
        "username": "Bret",
        "email": " Sincere@April.biz ",
        "address": {
            "street": "Kulas Light ",
            "suite": "Apt. 556",
            "city": "Gwenborough",
            "zipcode": "92998-3874",
            "geo": { "lat": "-37.3159", "lng": "81.1496" }
        },
        "phone": "1-770-736-8031 x56442",
        "website": "Hildegard.org",
        "company": {
            "name": "Romaguera-Crona",
            "catchPhrase": " Multi-layered client-server neural-net ",
            "bs": "harness real-time e-markets"
        }
    })
}

#[test]
fn clean_phone_strips_formatting() {
    assert_eq!(clean_phone("(123) 456-7890"), "1234567890");
    assert_eq!(clean_phone("1-770-736-8031 x56442"), "17707368031x56442");
    assert_eq!(clean_phone("493.170.9623"), "4931709623");
    assert_eq!(clean_phone(""), "");
}

#[test]
fn clean_website_adds_scheme_and_lowercases() {
    assert_eq!(clean_website("example.com"), "http://example.com");
    assert_eq!(clean_website(" HTTPS://Example.com "), "https://example.com");
    assert_eq!(clean_website("http://already.org"), "http://already.org");
    assert_eq!(clean_website(""), "");
    assert_eq!(clean_website("   "), "");
}

#[test]
fn clean_text_collapses_whitespace() {
    assert_eq!(clean_text("  sunt aut\nfacere \t repellat  "), "sunt aut facere repellat");
    assert_eq!(clean_text(""), "");
}

#[test]
fn clean_email_trims_and_lowercases() {
    assert_eq!(clean_email(" Sincere@April.BIZ "), "sincere@april.biz");
}

#[test]
fn transform_user_cleans_every_field() {
    let at = now();
    let user = transform_user(&raw_user(), at).unwrap();

    assert_eq!(user.id, 1);
    assert_eq!(user.name, "Leanne Graham");
    assert_eq!(user.username, "Bret");
    assert_eq!(user.email, "sincere@april.biz");
    assert_eq!(user.phone, "17707368031x56442");
    assert_eq!(user.website, "http://hildegard.org");
    assert_eq!(user.address.street, "Kulas Light");
    assert_eq!(
        user.address.geo,
        Some(Geo {
            lat: -37.3159,
            lng: 81.1496
        })
    );
    assert_eq!(
        user.company.catch_phrase,
        "Multi-layered client-server neural-net"
    );
    assert_eq!(user.created_at, at);
}

#[test]
fn unparseable_geo_falls_back_to_origin() {
    let mut raw = raw_user();
    raw["address"]["geo"] = json!({ "lat": "north", "lng": 12.5 });
    let user = transform_user(&raw, now()).unwrap();
    assert_eq!(user.address.geo, Some(Geo { lat: 0.0, lng: 0.0 }));
}

#[test]
fn numeric_geo_is_accepted() {
    let mut raw = raw_user();
    raw["address"]["geo"] = json!({ "lat": 1.5, "lng": -2 });
    let user = transform_user(&raw, now()).unwrap();
    assert_eq!(user.address.geo, Some(Geo { lat: 1.5, lng: -2.0 }));
}

#[test]
fn missing_address_and_company_default_to_empty() {
    let raw = json!({ "id": 3, "username": "x", "email": "x@example.com" });
    let user = transform_user(&raw, now()).unwrap();
    assert_eq!(user.address, Address::default());
    assert_eq!(user.company, Company::default());
    assert_eq!(user.phone, "");
    assert_eq!(user.website, "");
}

#[test]
fn user_without_id_is_rejected() {
    let mut raw = raw_user();
    raw.as_object_mut().unwrap().remove("id");
    assert_eq!(
        transform_user(&raw, now()).unwrap_err(),
        TransformError::MissingField("id")
    );
}

#[test]
fn user_with_null_id_is_rejected() {
    let mut raw = raw_user();
    raw["id"] = Value::Null;
    assert_eq!(
        transform_user(&raw, now()).unwrap_err(),
        TransformError::MissingField("id")
    );
}

#[test]
fn user_without_email_is_rejected() {
    let mut raw = raw_user();
    raw["email"] = json!("  ");
    assert_eq!(
        transform_user(&raw, now()).unwrap_err(),
        TransformError::MissingField("email")
    );
}

#[test]
fn string_id_is_invalid() {
    let raw = json!({ "id": "7", "userId": 1, "title": "t", "body": "b" });
    assert!(matches!(
        transform_post(&raw, now()),
        Err(TransformError::InvalidField { field: "id", .. })
    ));
}

#[test]
fn non_object_record_is_rejected() {
    assert_eq!(
        transform_comment(&json!([1, 2]), now()).unwrap_err(),
        TransformError::NotAnObject
    );
}

#[test]
fn transform_post_maps_author_and_cleans_text() {
    let raw = json!({
        "userId": 1,
        "id": 1,
        "title": "sunt aut facere\nrepellat",
        "body": "quia et suscipit\nsuscipit recusandae"
    });
    let post = transform_post(&raw, now()).unwrap();
    assert_eq!(post.user_id, 1);
    assert_eq!(post.title, "sunt aut facere repellat");
    assert_eq!(post.body, "quia et suscipit suscipit recusandae");
}

#[test]
fn transform_comment_maps_parent_post() {
    let raw = json!({
        "postId": 4,
        "id": 9,
        "name": "id labore ex",
        "email": "Eliseo@Gardner.biz",
        "body": "laudantium\nenim"
    });
    let comment = transform_comment(&raw, now()).unwrap();
    assert_eq!(comment.post_id, 4);
    assert_eq!(comment.email, "eliseo@gardner.biz");
    assert_eq!(comment.body, "laudantium enim");
}

#[test]
fn batch_skips_bad_records_and_keeps_the_rest() {
    let snapshot = RawSnapshot {
        users: vec![raw_user(), json!({ "name": "no id" })],
        posts: vec![
            json!({ "id": 1, "userId": 1, "title": "a", "body": "b" }),
            json!({ "id": 2, "title": "orphan without author" }),
            json!("not an object"),
        ],
        comments: vec![
            json!({ "id": 1, "postId": 1, "name": "n", "email": "e@x.io", "body": "b" }),
        ],
    };

    let batch = transform_snapshot(&snapshot, now());

    assert_eq!(batch.users.len(), 1);
    assert_eq!(batch.posts.len(), 1);
    assert_eq!(batch.comments.len(), 1);
    assert_eq!(batch.total(), 3);

    let metadata = batch.metadata();
    assert_eq!(metadata["users_processed"], json!(1));
    assert_eq!(metadata["posts_processed"], json!(1));
    assert_eq!(metadata["comments_processed"], json!(1));
}

#[test]
fn users_with_an_id_but_bad_fields_are_skipped_in_order() {
    let mut second = raw_user();
    second["id"] = json!(2);
    second["username"] = json!("Antonette");
    second["email"] = json!("Shanna@melissa.tv");
    let raw = vec![
        raw_user(),
        json!({ "id": 7, "username": "no-email" }),
        json!({ "id": "8", "username": "x", "email": "x@y.io" }),
        second,
    ];

    let users = transform_users(&raw, now());

    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn empty_snapshot_yields_empty_batch() {
    let batch = transform_snapshot(&RawSnapshot::default(), now());
    assert_eq!(batch, CleanBatch::default());
    assert_eq!(batch.total(), 0);
}
