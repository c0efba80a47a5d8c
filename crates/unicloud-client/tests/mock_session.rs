use unicloud_client::{DesignOutcome, DesignSession, MockBackend, ZIP_CONTENT_TYPE};
use unicloud_core::store::Role;
use unicloud_core::{NodeType, ProductType, TechStackField};

fn session() -> DesignSession<MockBackend> {
    let mut session = DesignSession::new(MockBackend::new());
    session.intake.set_product_type(ProductType::Webapp);
    session.intake.set_tech_stack_field(TechStackField::Frontend, "react");
    session.intake.set_tech_stack_field(TechStackField::Database, "postgres");
    session
}

#[tokio::test]
async fn design_iterate_and_export_offline() {
    let mut session = session();

    let outcome = session.design_initial().await.unwrap();
    assert_eq!(outcome, DesignOutcome::Generated);
    let first = session.graph.graph().clone();
    assert_eq!(first.nodes.len(), 5);
    assert_eq!(first.nodes[3].node_type, NodeType::EcsService);
    assert_eq!(first.nodes[3].props["multiplier"], 2);

    session.send_message("can we cut the cost?").await.unwrap();
    let cheaper = session.graph.graph();
    assert_eq!(cheaper.nodes.len(), 4);
    assert_eq!(cheaper.nodes[1].node_type, NodeType::Cloudfront);
    assert_eq!(
        session.chat.messages().last().unwrap().content,
        "Cost-optimized serverless architecture with CDN and managed database"
    );
    assert_eq!(session.chat.messages().last().unwrap().role, Role::Assistant);

    let archive = session.export_terraform().await.unwrap();
    assert_eq!(archive.content_type, ZIP_CONTENT_TYPE);
    let text = String::from_utf8(archive.bytes).unwrap();
    assert!(text.contains("# Components: 4"));
    assert!(text.contains("# Connections: 3"));
}
