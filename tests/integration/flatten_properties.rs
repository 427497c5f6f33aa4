use collection_scribe::tree::{
    flatten, locate, FolderNode, Method, Node, RequestNode, RequestPayload, RequestUrl,
};
use proptest::prelude::*;

fn arb_method() -> impl Strategy<Value = Method> {
    prop::sample::select(vec![
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
        Method::Options,
    ])
}

fn arb_node() -> impl Strategy<Value = Node> {
    let leaf = ("[a-z]{1,8}", arb_method(), any::<bool>()).prop_map(|(name, method, has_url)| {
        let mut payload = RequestPayload::new(method, RequestUrl::Raw(format!("https://api.test/{}", name)));
        if !has_url {
            payload.url = None;
        }
        Node::Request(RequestNode::new(name, payload))
    });
    leaf.prop_recursive(4, 48, 5, |inner| {
        ("[A-Z][a-z]{0,6}", prop::collection::vec(inner, 0..5))
            .prop_map(|(name, children)| Node::Folder(FolderNode::new(name, children)))
    })
}

fn arb_forest() -> impl Strategy<Value = Vec<Node>> {
    prop::collection::vec(arb_node(), 0..6)
}

/// Request paths in pre-order, built independently of `flatten`
fn request_paths(nodes: &[Node], prefix: &str, out: &mut Vec<String>) {
    for node in nodes {
        let path = format!("{}/{}", prefix, node.name());
        match node {
            Node::Folder(folder) => request_paths(&folder.children, &path, out),
            Node::Request(_) => out.push(path),
        }
    }
}

/// Give every node a distinct id, numbering in pre-order
fn assign_ids(nodes: &mut [Node], next: &mut usize, ids: &mut Vec<String>) {
    for node in nodes {
        let id = format!("n{}", next);
        *next += 1;
        ids.push(id.clone());
        match node {
            Node::Folder(folder) => {
                folder.id = Some(id);
                assign_ids(&mut folder.children, next, ids);
            }
            Node::Request(request) => request.id = Some(id),
        }
    }
}

proptest! {
    #[test]
    fn flatten_visits_each_request_once_in_pre_order(forest in arb_forest()) {
        let mut expected = Vec::new();
        request_paths(&forest, "", &mut expected);

        let descriptors = flatten(&forest);
        let paths: Vec<String> = descriptors.iter().map(|d| d.path.clone()).collect();
        prop_assert_eq!(paths, expected);
    }

    #[test]
    fn flatten_never_reports_folders_or_missing_fields(forest in arb_forest()) {
        for descriptor in flatten(&forest) {
            prop_assert!(descriptor.path.starts_with('/'));
            prop_assert!(!descriptor.method.is_empty());
            prop_assert!(!descriptor.url.is_empty());
            prop_assert_eq!(descriptor.auth.as_str(), "None");
            prop_assert_eq!(descriptor.headers.as_str(), "None");
        }
    }

    #[test]
    fn every_assigned_id_can_be_located(mut forest in arb_forest()) {
        let mut ids = Vec::new();
        assign_ids(&mut forest, &mut 0, &mut ids);
        for id in &ids {
            let found = locate(&forest, id);
            prop_assert!(found.is_some());
            prop_assert_eq!(found.and_then(Node::id), Some(id.as_str()));
        }
        prop_assert!(locate(&forest, "absent").is_none());
    }
}
