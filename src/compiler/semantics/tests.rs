#[cfg(test)]
mod tests {
    use crate::{
        compiler::ast::{Scalar, StatementKind, StorageClass},
        project::model::ScopeModel,
    };

    use super::super::{
        call_tree::{count_references, prune},
        mangle::{is_identifier, mangle, sanitize},
        symbol_table::{BlockType, ScopeTree},
        *,
    };

    fn tree(text: &str) -> ModelResult<ScopeTree> {
        let model: ScopeModel = serde_yaml::from_str(text).unwrap();
        ScopeTree::from_model(&model)
    }

    fn mangled(text: &str) -> ScopeTree {
        let mut tree = tree(text).unwrap();
        mangle(&mut tree).unwrap();
        tree
    }

    fn root_names(tree: &ScopeTree) -> Vec<String> {
        tree.get(tree.root())
            .table()
            .iter()
            .map(|v| v.name.clone())
            .collect()
    }

    #[test]
    fn test_case_folding() {
        let tree = tree(
            "
variables:
  - {name: counter, type: fixed}
code:
  - kind:
      ASSIGN:
        lhs: [{token: {identifier: counter}}]
        rhs: {token: {builtin: length}, children: [{token: {string: abc}}]}
",
        )
        .unwrap();
        let root = tree.root();
        assert!(tree.lookup(root, "COUNTER").is_some());
        match &tree.get(root).code()[0].kind {
            StatementKind::Assign { lhs, rhs } => {
                assert_eq!(lhs[0].get_identifier(), Some("COUNTER"));
                assert!(rhs.is_builtin("LENGTH"));
                assert_eq!(rhs.to_string(), "LENGTH('abc')");
            }
            kind => panic!("Expected an assignment, got {:?}", kind),
        }
    }

    #[test]
    fn test_parameters() {
        let tree = tree(
            "
variables:
  - name: P
    type:
      procedure:
        parameters: [x]
        returns: character
        scope:
          variables:
            - {name: X, type: fixed}
            - {name: Y, type: {bit: 4}}
",
        )
        .unwrap();
        let p = tree.lookup(tree.root(), "P").unwrap();
        let proc = p.get_procedure().unwrap();
        assert_eq!(proc.parameters, vec!["X".to_string()]);
        assert_eq!(proc.return_type(), Scalar::Character);

        let body = tree.get(proc.scope);
        assert_eq!(body.block(), BlockType::Procedure);
        assert_eq!(body.table().get("X").unwrap().storage, StorageClass::Parameter);
        assert_eq!(body.table().get("Y").unwrap().storage, StorageClass::NonCommon);
        assert_eq!(tree.procedure_of(proc.scope), Some(proc));
        assert_eq!(tree.procedure_of(tree.root()), None);
    }

    #[test]
    fn test_model_errors() {
        let err = tree(
            "
variables:
  - {name: A, type: fixed, line: 3}
  - {name: a, type: character, line: 4}
",
        )
        .unwrap_err();
        assert_eq!(err.line(), 4);
        assert_eq!(*err.get_inner(), ModelError::AlreadyDeclared("A".into()));

        let err = tree("variables: [{name: 9LIVES, type: fixed, line: 2}]").unwrap_err();
        assert_eq!(*err.get_inner(), ModelError::InvalidIdentifier("9LIVES".into()));

        let err = tree("variables: [{name: R, type: {based: {record: []}}}]").unwrap_err();
        assert_eq!(*err.get_inner(), ModelError::EmptyRecord("R".into()));

        let err = tree(
            "variables: [{name: R, type: {based: {record: [{name: F, type: fixed}, {name: f, type: fixed}]}}}]",
        )
        .unwrap_err();
        assert_eq!(
            *err.get_inner(),
            ModelError::DuplicateField("R".into(), "F".into())
        );
    }

    #[test]
    fn test_undeclared_parameter() {
        let err = tree(
            "
variables:
  - name: P
    line: 7
    type:
      procedure:
        parameters: [X, Y]
        scope:
          variables: [{name: X, type: fixed}]
code:
  - kind: {CALL: {name: P, args: [{token: {number: 1}}]}}
",
        )
        .unwrap_err();
        assert_eq!(err.line(), 7);
        assert_eq!(
            *err.get_inner(),
            ModelError::UndeclaredParameter("P".into(), "Y".into())
        );
    }

    #[test]
    fn test_mangle_rejects_block_shadowing() {
        let mut tree = tree(
            "
variables:
  - name: P
    type:
      procedure:
        scope:
          variables: [{name: I, type: fixed}]
          code:
            - kind:
                BLOCK:
                  variables: [{name: I, type: fixed, line: 12}]
",
        )
        .unwrap();
        let err = mangle(&mut tree).unwrap_err();
        assert_eq!(err.line(), 12);
        assert_eq!(
            *err.get_inner(),
            ModelError::DuplicateMangledName("I".into(), "PxI".into())
        );

        // The same name in sibling procedures stays distinct.
        let mut tree = tree_of_siblings();
        assert!(mangle(&mut tree).is_ok());
    }

    fn tree_of_siblings() -> ScopeTree {
        tree(
            "
variables:
  - {name: I, type: fixed}
  - name: P
    type: {procedure: {scope: {variables: [{name: I, type: fixed}]}}}
  - name: Q
    type: {procedure: {scope: {variables: [{name: I, type: fixed}]}}}
",
        )
        .unwrap()
    }

    #[test]
    fn test_scope_order() {
        let tree = tree(
            "
variables:
  - {name: P, type: {procedure: {}}}
code:
  - kind:
      WHILE:
        cond: {token: {number: 1}}
        block:
          label: loop
          code: [{kind: {BLOCK: {}}}]
  - kind: {CASE: {selector: {token: {number: 0}}, block: {}}}
",
        )
        .unwrap();
        let root = tree.root();
        let children = tree.get(root).children().to_vec();
        let kinds: Vec<BlockType> = children.iter().map(|c| tree.get(*c).block()).collect();
        assert_eq!(
            kinds,
            vec![BlockType::Procedure, BlockType::DoWhile, BlockType::DoCase]
        );
        assert_eq!(tree.get(children[1]).label(), Some("LOOP"));

        let walk: Vec<BlockType> = tree.walk(root).iter().map(|id| tree.get(*id).block()).collect();
        assert_eq!(
            walk,
            vec![
                BlockType::Root,
                BlockType::Procedure,
                BlockType::DoWhile,
                BlockType::DoBlock,
                BlockType::DoCase
            ]
        );
        assert!(BlockType::DoWhile.is_loop());
        assert!(!BlockType::DoCase.is_loop());
    }

    #[test]
    fn test_lookup() {
        let tree = tree(
            "
variables:
  - {name: A, type: fixed}
  - name: P
    type:
      procedure:
        scope:
          variables: [{name: A, type: character}]
          code: [{kind: {BLOCK: {variables: [{name: B, type: fixed}]}}}]
",
        )
        .unwrap();
        let root = tree.root();
        let proc = tree.lookup(root, "P").unwrap().get_procedure().unwrap().scope;
        let block = tree.get(proc).children()[0];

        let (found, var) = tree.lookup_with_scope(block, "A").unwrap();
        assert_eq!(found, proc);
        assert_eq!(var.scalar(), Some(Scalar::Character));
        assert!(tree.lookup(block, "P").is_some());
        assert!(tree.lookup(root, "B").is_none());

        assert_eq!(tree.enclosing_procedure(block), Some(proc));
        assert_eq!(tree.enclosing_procedure(root), None);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("A@B#C$D_E"), "AaBpCdD_E");
        assert!(is_identifier("@X"));
        assert!(is_identifier("X_1"));
        assert!(!is_identifier("1X"));
        assert!(!is_identifier("X-Y"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_mangle() {
        let tree = mangled(
            "
variables:
  - {name: V@, type: fixed}
  - name: A
    type:
      procedure:
        scope:
          variables:
            - {name: X, type: fixed}
            - name: B#
              type:
                procedure:
                  scope:
                    code: [{kind: {BLOCK: {variables: [{name: Y, type: fixed}]}}}]
                    variables:
                      - {name: C, type: {procedure: {}}}
",
        );
        let root = tree.root();
        assert_eq!(tree.lookup(root, "V@").unwrap().mangled, "Va");

        let a = tree.lookup(root, "A").unwrap();
        assert_eq!(a.mangled, "A");
        let a_scope = a.get_procedure().unwrap().scope;
        assert_eq!(tree.lookup(a_scope, "X").unwrap().mangled, "AxX");

        let b = tree.lookup(a_scope, "B#").unwrap();
        assert_eq!(b.mangled, "AxBp");
        let b_scope = b.get_procedure().unwrap().scope;
        let c = tree.lookup(b_scope, "C").unwrap();
        assert_eq!(c.mangled, "AxBpxC");

        let block = tree
            .get(b_scope)
            .children()
            .iter()
            .copied()
            .find(|id| tree.get(*id).block() == BlockType::DoBlock)
            .unwrap();
        assert_eq!(tree.lookup(block, "Y").unwrap().mangled, "AxBpxY");

        let names: Vec<String> = tree
            .functions()
            .into_iter()
            .map(|id| tree.function_name(id))
            .collect();
        assert_eq!(names, vec!["main", "A", "AxBp", "AxBpxC"]);
    }

    const CALLS: &str = "
variables:
  - name: USED
    type:
      procedure:
        scope:
          code: [{kind: {CALL: {name: HELPER}}}]
  - name: HELPER
    type: {procedure: {}}
  - name: ORPHAN
    type:
      procedure:
        scope:
          code: [{kind: {CALL: {name: LONELY}}}, {kind: {CALL: {name: ORPHAN}}}]
  - name: LONELY
    type: {procedure: {}}
  - name: F
    type: {procedure: {returns: fixed}}
  - name: COMPACTIFY
    type: {procedure: {}}
  - {name: A, type: fixed}
code:
  - kind: {CALL: {name: USED}}
  - kind:
      IF:
        token: {operator: '='}
        children: [{token: {identifier: F}}, {token: {identifier: A}}]
  - kind: {CALL: {name: COMPACTIFY}}
";

    #[test]
    fn test_count_references() {
        let tree = tree(CALLS).unwrap();
        let counts = count_references(&tree);
        assert_eq!(counts["USED"], 1);
        assert_eq!(counts["HELPER"], 1);
        assert_eq!(counts["ORPHAN"], 0);
        assert_eq!(counts["LONELY"], 1);
        assert_eq!(counts["F"], 1);
        assert!(!counts.contains_key("A"));
    }

    #[test]
    fn test_prune() {
        let mut tree = tree(CALLS).unwrap();
        let removed = prune(&mut tree);
        assert_eq!(removed, vec!["COMPACTIFY", "ORPHAN", "LONELY"]);
        assert_eq!(root_names(&tree), vec!["USED", "HELPER", "F", "A"]);

        let root = tree.root();
        assert_eq!(tree.walk(root).len(), 4);
        let used = tree.lookup(root, "USED").unwrap().get_procedure().unwrap();
        assert_eq!(used.calls, 1);

        // Pruning again finds nothing more.
        assert!(prune(&mut tree).is_empty());
    }
}
