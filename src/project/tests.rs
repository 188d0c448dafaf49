#[cfg(test)]
mod tests {
    use crate::compiler::{
        ast::{Expression, Scalar, Token},
        config::GeneratorConfig,
        translate,
    };

    use super::super::{
        model::{BasedModel, KindModel, TypeModel},
        *,
    };

    #[test]
    fn test_model_from_yaml() {
        let model: ScopeModel = serde_yaml::from_str(
            "
variables:
  - {name: B, type: {bit: 12}, top: 4, initial: [1, '2']}
  - {name: R, type: {based: {record: [{name: F, type: character, top: 2}]}}, common: true}
code:
  - line: 3
    text: DO I = 1 TO 10;
    kind:
      FOR:
        index: {token: {identifier: I}}
        from: {token: {number: 1}}
        to: {token: {number: 10}}
        block: {}
",
        )
        .unwrap();

        assert_eq!(model.variables[0].ty, TypeModel::Bit(12));
        assert_eq!(model.variables[0].top, Some(4));
        assert!(!model.variables[0].common);
        match &model.variables[1].ty {
            TypeModel::Based(BasedModel::Record(fields)) => {
                assert_eq!(fields[0].ty, Scalar::Character);
                assert_eq!(fields[0].top, Some(2));
            }
            ty => panic!("Expected a BASED RECORD, got {:?}", ty),
        }
        assert!(model.variables[1].common);

        let stmt = &model.code[0];
        assert_eq!(stmt.line, 3);
        match &stmt.kind {
            KindModel::For { by, .. } => assert_eq!(*by, Expression::number(1)),
            kind => panic!("Expected a FOR, got {:?}", kind),
        }
    }

    #[test]
    fn test_model_from_json() {
        let model: ScopeModel = serde_json::from_str(
            r#"{
                "variables": [{"name": "S", "type": "character"}],
                "code": [
                    {"kind": {"CALL": {"name": "P", "args": [{"token": {"string": "x"}}]}}},
                    {"kind": "ELSE"},
                    {"kind": {"RETURN": null}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(model.variables[0].ty, TypeModel::Character);
        match &model.code[0].kind {
            KindModel::Call { name, args } => {
                assert_eq!(name, "P");
                assert_eq!(args[0].token, Token::String("x".into()));
            }
            kind => panic!("Expected a CALL, got {:?}", kind),
        }
        assert_eq!(model.code[1].kind, KindModel::Else);
        assert_eq!(model.code[2].kind, KindModel::Return(None));
    }

    #[test]
    fn test_manifest() {
        let model: ScopeModel = serde_yaml::from_str(
            "
variables:
  - {name: C, type: fixed, common: true}
  - {name: R, type: {based: {record: [{name: F, type: {bit: 16}, top: 1}]}}}
  - {name: P, type: {procedure: {}}}
",
        )
        .unwrap();
        let translation = translate(&model, &GeneratorConfig::default()).unwrap();
        let manifest = Manifest::extract("prog", &translation);

        assert_eq!(manifest.program, "prog");
        assert_eq!(manifest.common_base, 0);
        assert_eq!(manifest.non_common_base, 4);
        assert_eq!(manifest.removed, vec!["P"]);
        assert_eq!(manifest.symbols.len(), 2);

        let c = manifest.get_symbol("C").unwrap();
        assert_eq!((c.address, c.datatype.as_str(), c.dir_width), (0, "FIXED", 4));
        assert!(c.fields.is_empty());

        let r = manifest.get_symbol("R").unwrap();
        assert_eq!(r.datatype, "BASED");
        assert_eq!(r.fields.len(), 1);
        assert_eq!(r.fields[0].name, "F");
        assert_eq!(r.fields[0].num_elements, 2);
        assert_eq!(r.fields[0].dir_width, 2);
        assert_eq!(r.fields[0].bit_width, 16);

        let text = serde_yaml::to_string(&manifest).unwrap();
        let reread: Manifest = serde_yaml::from_str(&text).unwrap();
        assert_eq!(reread, manifest);
    }
}
